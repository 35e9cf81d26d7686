//! Login command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;

use firedb_core::{Credentials, SessionStatus};

use crate::cli::GlobalArgs;
use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account e-mail address
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long)]
    pub password: String,
}

pub async fn run(global: &GlobalArgs, args: LoginArgs) -> Result<()> {
    let ctx = AppContext::open(global)?;
    let sessions = ctx.app().sessions();

    ctx.resume_session().await?;

    eprintln!("{}", "Logging in...".dimmed());

    let credentials = Credentials::new(&args.email, &args.password);
    if let Err(err) = sessions.sign_in(&credentials).await {
        if let Some(message) = sessions.last_error() {
            output::error(&message);
        }
        return Err(err).context("Failed to log in");
    }

    ctx.persist()?;

    match sessions.status() {
        SessionStatus::SignedIn(session) => {
            output::success("Logged in successfully");
            println!();
            output::field("User ID", session.user_id.as_str());
            if let Some(email) = &session.email {
                output::field("Email", email);
            }
            Ok(())
        }
        SessionStatus::Degraded { user_id } => {
            if let Some(message) = sessions.last_error() {
                output::error(&message);
            }
            bail!("Signed in as {} but no credential token could be obtained", user_id)
        }
        SessionStatus::SignedOut => bail!("Sign-in was not confirmed by the identity provider"),
    }
}
