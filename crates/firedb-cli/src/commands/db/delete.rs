//! Delete command implementation.

use anyhow::Result;
use clap::Args;

use crate::context::AppContext;
use crate::output;

use super::{finish, parse_path};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Database location to remove
    pub path: String,
}

pub async fn run(ctx: &AppContext, args: DeleteArgs) -> Result<()> {
    let path = parse_path(&args.path)?;

    let result = ctx.app().database().delete(&path).await;
    finish(ctx, result, "delete data")?;

    output::success(&format!("Deleted {}", path));
    Ok(())
}
