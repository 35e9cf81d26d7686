//! Put command implementation.

use anyhow::Result;
use clap::Args;

use crate::context::AppContext;
use crate::output;

use super::{finish, parse_json, parse_path};

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Database location
    pub path: String,

    /// JSON value to store
    pub value: String,

    /// Pretty-print the result
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(ctx: &AppContext, args: PutArgs) -> Result<()> {
    let path = parse_path(&args.path)?;
    let value = parse_json(&args.value)?;

    let result = ctx.app().database().put(&path, &value).await;
    let stored = finish(ctx, result, "write data")?;

    output::json(&stored, args.pretty)
}
