//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::auth::AuthCommand;
use crate::commands::db::DbCommand;
use crate::commands::template::TemplateCommand;

/// Firebase Auth and Realtime Database from the command line.
#[derive(Parser, Debug)]
#[command(name = "firedb")]
#[command(author, version = env!("FIREDB_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Project selection shared by every command that talks to Firebase.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Settings file with per-environment apiKey and databaseURL
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Deployment environment (development or live)
    #[arg(long, global = true, value_name = "NAME")]
    pub env: Option<String>,

    /// Base URL of a Firebase Auth emulator
    #[arg(long, global = true, value_name = "URL")]
    pub auth_emulator: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in, sign out and inspect the session
    Auth(AuthCommand),
    /// Realtime Database operations
    Db(DbCommand),
    /// Render handlebars templates
    Template(TemplateCommand),
}
