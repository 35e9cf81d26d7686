//! Core Firebase types.
//!
//! These types enforce their invariants at construction time,
//! ensuring invalid states are unrepresentable.

mod api_key;
mod database_url;
mod db_path;
mod user_id;

pub use api_key::ApiKey;
pub use database_url::DatabaseUrl;
pub use db_path::DbPath;
pub use user_id::UserId;
