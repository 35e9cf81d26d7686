//! Subcommand implementations.

pub mod auth;
pub mod db;
pub mod template;
