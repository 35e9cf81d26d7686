//! firedb-core - Firebase auth sessions and a token-aware Realtime Database client.
//!
//! The [`SessionManager`] signs users in and out against an
//! [`IdentityProvider`](traits::IdentityProvider) and is the only writer of
//! the credential token. The [`DatabaseClient`] reads that token before every
//! request and, when the store reports it expired, refreshes through the
//! session manager and resends the request exactly once.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod database;
pub mod error;
pub mod observer;
pub mod storage;
pub mod tokens;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthEvent, LoginAttempt, RefreshMode, Session, SessionManager, SessionStatus};
pub use config::{Environment, EnvironmentSettings, FirebaseSettings, SettingsProvider, StaticSettings};
pub use credentials::Credentials;
pub use database::{DatabaseClient, GetOptions, Method, OutgoingRequest};
pub use error::{AuthError, Error};
pub use observer::{ObserverId, ObserverRegistry};
pub use storage::{CredentialStore, MemoryStorage, ScopedStorage};
pub use tokens::IdToken;
pub use traits::{IdentityProvider, TokenRefresher, Transport};
pub use types::{ApiKey, DatabaseUrl, DbPath, UserId};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
