//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::GlobalArgs;
use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(global: &GlobalArgs, _args: LogoutArgs) -> Result<()> {
    let ctx = AppContext::open(global)?;
    let sessions = ctx.app().sessions();

    if !ctx.resume_session().await? {
        output::success("Not logged in");
        return Ok(());
    }

    if let Err(err) = sessions.sign_out().await {
        if let Some(message) = sessions.last_error() {
            output::error(&message);
        }
        return Err(err).context("Failed to log out");
    }

    ctx.persist()?;
    output::success("Logged out");

    Ok(())
}
