//! Auth subcommand implementations.

mod login;
mod logout;
mod refresh_token;
mod whoami;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::GlobalArgs;

#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Sign in with e-mail and password
    Login(login::LoginArgs),

    /// Sign out and forget the stored credential
    Logout(logout::LogoutArgs),

    /// Display the signed-in user
    Whoami(whoami::WhoamiArgs),

    /// Mint a new credential token for the signed-in user
    RefreshToken(refresh_token::RefreshTokenArgs),
}

pub async fn handle(global: &GlobalArgs, cmd: AuthCommand) -> Result<()> {
    match cmd.command {
        AuthSubcommand::Login(args) => login::run(global, args).await,
        AuthSubcommand::Logout(args) => logout::run(global, args).await,
        AuthSubcommand::Whoami(args) => whoami::run(global, args).await,
        AuthSubcommand::RefreshToken(args) => refresh_token::run(global, args).await,
    }
}
