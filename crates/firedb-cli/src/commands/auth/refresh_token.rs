//! Refresh token command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::GlobalArgs;
use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct RefreshTokenArgs {}

pub async fn run(global: &GlobalArgs, _args: RefreshTokenArgs) -> Result<()> {
    let ctx = AppContext::open(global)?;

    if !ctx.restore_provider()? {
        anyhow::bail!("No active session. Run 'firedb auth login' first.");
    }

    eprintln!("{}", "Refreshing credential token...".dimmed());

    let refreshed = ctx.app().sessions().refresh_token().await;
    ctx.persist()?;
    refreshed.context("Failed to refresh credential token")?;

    output::success("Credential token refreshed");
    if let Some(record) = ctx.app().identity().session_record() {
        output::field("User ID", record.uid.as_str());
    }

    Ok(())
}
