//! Realtime Database subcommand implementations.

mod delete;
mod get;
mod post;
mod put;
mod update;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value;

use firedb_core::DbPath;

use crate::cli::GlobalArgs;
use crate::context::AppContext;

#[derive(Args, Debug)]
pub struct DbCommand {
    #[command(subcommand)]
    pub command: DbSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum DbSubcommand {
    /// Read the data at a location
    Get(get::GetArgs),

    /// Replace the data at a location
    Put(put::PutArgs),

    /// Append a child with a generated key
    Post(post::PostArgs),

    /// Remove the data at a location
    Delete(delete::DeleteArgs),

    /// Write several locations atomically
    Update(update::UpdateArgs),
}

pub async fn handle(global: &GlobalArgs, cmd: DbCommand) -> Result<()> {
    let ctx = open(global)?;
    match cmd.command {
        DbSubcommand::Get(args) => get::run(&ctx, args).await,
        DbSubcommand::Put(args) => put::run(&ctx, args).await,
        DbSubcommand::Post(args) => post::run(&ctx, args).await,
        DbSubcommand::Delete(args) => delete::run(&ctx, args).await,
        DbSubcommand::Update(args) => update::run(&ctx, args).await,
    }
}

/// Open the app with the persisted user handed back to the identity
/// provider, so an expired credential can be refreshed.
fn open(global: &GlobalArgs) -> Result<AppContext> {
    let ctx = AppContext::open(global)?;
    ctx.restore_provider()?;
    Ok(ctx)
}

/// Save provider state, which a refresh may have rotated, then surface the
/// operation's outcome.
fn finish<T>(ctx: &AppContext, result: firedb_core::Result<T>, action: &str) -> Result<T> {
    ctx.persist()?;
    result.with_context(|| format!("Failed to {}", action))
}

fn parse_path(path: &str) -> Result<DbPath> {
    DbPath::new(path).with_context(|| format!("Invalid database path '{}'", path))
}

fn parse_json(text: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("Invalid JSON value: {}", text))
}
