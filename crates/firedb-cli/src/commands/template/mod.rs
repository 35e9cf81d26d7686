//! Template subcommand implementations.

mod render;

use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct TemplateCommand {
    #[command(subcommand)]
    pub command: TemplateSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum TemplateSubcommand {
    /// Render a template with JSON data and print the HTML
    Render(render::RenderArgs),
}

pub async fn handle(cmd: TemplateCommand) -> Result<()> {
    match cmd.command {
        TemplateSubcommand::Render(args) => render::run(args).await,
    }
}
