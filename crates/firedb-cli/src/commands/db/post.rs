//! Post command implementation.

use anyhow::Result;
use clap::Args;

use crate::context::AppContext;
use crate::output;

use super::{finish, parse_json, parse_path};

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Parent location of the new child
    pub path: String,

    /// JSON value of the new child
    pub value: String,
}

pub async fn run(ctx: &AppContext, args: PostArgs) -> Result<()> {
    let path = parse_path(&args.path)?;
    let value = parse_json(&args.value)?;

    let result = ctx.app().database().post(&path, &value).await;
    let created = finish(ctx, result, "append data")?;

    // The response carries the generated key as {"name": "..."}.
    output::json(&created, false)
}
