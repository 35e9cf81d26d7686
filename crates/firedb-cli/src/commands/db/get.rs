//! Get command implementation.

use anyhow::{Context, Result};
use clap::Args;

use firedb_core::GetOptions;

use crate::context::AppContext;
use crate::output;

use super::{finish, parse_path};

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Database location, e.g. pages/home
    pub path: String,

    /// Only list the immediate children
    #[arg(long)]
    pub shallow: bool,

    /// Extra query parameter as name=value (repeatable)
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Pretty-print the result
    #[arg(long)]
    pub pretty: bool,
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    Ok((name.to_string(), value.to_string()))
}

pub async fn run(ctx: &AppContext, args: GetArgs) -> Result<()> {
    let path = parse_path(&args.path)?;

    let mut options = GetOptions::new();
    if args.shallow {
        options = options.shallow();
    }
    for (name, value) in args.params {
        options = options
            .param(&name, value)
            .with_context(|| format!("Invalid query parameter '{}'", name))?;
    }

    let result = ctx.app().database().get(&path, options).await;
    let value = finish(ctx, result, "read data")?;

    output::json(&value, args.pretty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_split_on_first_equals() {
        assert_eq!(
            parse_param("equalTo=a=b").unwrap(),
            ("equalTo".to_string(), "a=b".to_string())
        );
        assert!(parse_param("orderBy").is_err());
    }
}
