//! Render command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use firedb_template::{DefaultSource, Page, Template};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template file or http(s) URL
    pub template: String,

    /// JSON object to render with
    #[arg(long, default_value = "{}")]
    pub data: String,

    /// Resolve relative template paths against this directory
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

const REGION: &str = "main";

pub async fn run(args: RenderArgs) -> Result<()> {
    let data: Value = serde_json::from_str(&args.data).context("Invalid --data JSON")?;

    let source = match args.root {
        Some(root) => DefaultSource::with_file_root(root)?,
        None => DefaultSource::new()?,
    };
    let page = Arc::new(Page::with_regions([REGION]));

    let mut template = Template::new(&args.template, REGION, data, Arc::new(source), page.clone())?;
    template
        .display_main()
        .await
        .with_context(|| format!("Failed to render {}", args.template))?;

    println!("{}", page.html(REGION).unwrap_or_default());
    Ok(())
}
