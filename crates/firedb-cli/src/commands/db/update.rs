//! Update command implementation.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use clap::Args;
use serde_json::Value;

use crate::context::AppContext;
use crate::output;

use super::{finish, parse_json, parse_path};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// JSON object mapping locations to new values,
    /// e.g. '{"pages/home/title": "Home", "pages/about": null}'
    pub updates: String,
}

pub async fn run(ctx: &AppContext, args: UpdateArgs) -> Result<()> {
    let Value::Object(entries) = parse_json(&args.updates)? else {
        bail!("Updates must be a JSON object keyed by location");
    };

    let mut updates = BTreeMap::new();
    for (path, value) in entries {
        updates.insert(parse_path(&path)?, value);
    }

    let count = updates.len();
    let result = ctx.app().database().update(&updates).await;
    finish(ctx, result, "update data")?;

    output::success(&format!("Updated {} location(s)", count));
    Ok(())
}
