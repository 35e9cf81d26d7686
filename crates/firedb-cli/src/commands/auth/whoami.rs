//! Whoami command implementation.

use anyhow::{Result, bail};
use chrono::Local;
use clap::Args;

use firedb_core::SessionStatus;

use crate::cli::GlobalArgs;
use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub async fn run(global: &GlobalArgs, _args: WhoamiArgs) -> Result<()> {
    let ctx = AppContext::open(global)?;

    let resumed = ctx.resume_session().await?;
    ctx.persist()?;
    if !resumed {
        bail!("No active session. Run 'firedb auth login' first.");
    }

    let sessions = ctx.app().sessions();
    match sessions.status() {
        SessionStatus::SignedIn(session) => {
            output::field("User ID", session.user_id.as_str());
            if let Some(email) = &session.email {
                output::field("Email", email);
            }
            let since = session.established_at.with_timezone(&Local);
            output::field("Session", &since.format("%Y-%m-%d %H:%M:%S").to_string());
            output::field("Project", ctx.app().settings().database_url.as_str());
            Ok(())
        }
        SessionStatus::Degraded { user_id } => {
            output::field("User ID", user_id.as_str());
            let message = sessions
                .last_error()
                .unwrap_or_else(|| "unknown error".to_string());
            bail!("Could not obtain a credential token: {}", message)
        }
        SessionStatus::SignedOut => {
            bail!("Stored session is no longer valid. Run 'firedb auth login' again.")
        }
    }
}
