//! Error types for the firedb library.
//!
//! This module provides a unified error type with explicit variants for
//! initialization, authentication, token refresh, remote store, transport,
//! storage, configuration and input validation failures.

use std::fmt;
use thiserror::Error;

/// Error message the Realtime Database returns when the `auth` token has expired.
pub const TOKEN_EXPIRED_SENTINEL: &str = "Auth token is expired";

/// The unified error type for firedb operations.
///
/// Every operation reports failure as a value of this type. Callers that need
/// to react to a specific case can match on the variant.
#[derive(Debug, Error)]
pub enum Error {
    /// The component failed to initialize and rejects every operation.
    #[error("initialization error: {0}")]
    Initialization(#[from] InitializationError),

    /// Sign-in or sign-out failures.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Acquiring a fresh token from the identity provider failed.
    #[error("token refresh failed: {0}")]
    TokenRefresh(#[from] TokenRefreshError),

    /// The document store rejected the operation.
    #[error("remote operation failed: {0}")]
    Remote(#[from] RemoteError),

    /// The store still reported an expired token after the single retry.
    #[error("token still expired after retrying {method} {path}")]
    TokenExpiredRetryExhausted { method: &'static str, path: String },

    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Scoped storage failures.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be resolved.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input validation errors (invalid path, URL, update map).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns true if this is the store's token-expiry signal.
    pub fn is_token_expired(&self) -> bool {
        matches!(self, Error::Remote(remote) if remote.is_token_expired())
    }
}

/// Reasons a component ended up permanently unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitializationError {
    /// The configuration provider could not supply settings.
    #[error("configuration unavailable: {0}")]
    Configuration(String),

    /// The credential storage could not be read.
    #[error("credential storage unavailable: {0}")]
    Storage(String),
}

/// Authentication-related errors.
///
/// The `Display` text is technical; [`AuthError::user_message`] returns the
/// text shown to end users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// A session already exists.
    #[error("already authenticated")]
    AlreadyAuthenticated,

    /// The identity provider rejected the secret.
    #[error("invalid credential secret")]
    InvalidCredentialSecret,

    /// The identity provider does not know the identifier.
    #[error("unknown identifier")]
    UnknownIdentifier,

    /// Any other sign-in failure.
    #[error("sign-in failed{}", code_suffix(.code))]
    GenericAuthFailure { code: Option<String> },

    /// The provider failed to sign out.
    #[error("sign-out failed{}", code_suffix(.code))]
    SignOutFailure { code: Option<String> },

    /// A user is known to the provider but no token could be acquired.
    #[error("token acquisition failed: {0}")]
    TokenAcquisition(TokenRefreshError),

    /// The stored credential could not be removed on sign-out.
    #[error("credential cleanup failed: {message}")]
    CredentialCleanup { message: String },
}

fn code_suffix(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(" ({})", code),
        None => String::new(),
    }
}

impl AuthError {
    /// Classify a sign-in failure reported by the identity provider.
    pub fn classify_sign_in(error: &ProviderError) -> Self {
        match error.code.as_deref() {
            Some(crate::traits::codes::WRONG_PASSWORD) => AuthError::InvalidCredentialSecret,
            Some(crate::traits::codes::USER_NOT_FOUND) => AuthError::UnknownIdentifier,
            _ => AuthError::GenericAuthFailure {
                code: error.code.clone(),
            },
        }
    }

    /// Message suitable for display to end users.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::AlreadyAuthenticated => {
                "You cannot login, you are already logged in!".to_string()
            }
            AuthError::InvalidCredentialSecret => "Wrong password".to_string(),
            AuthError::UnknownIdentifier => "Wrong e-mail address.".to_string(),
            AuthError::GenericAuthFailure { .. } => "Problem while logging in.".to_string(),
            AuthError::SignOutFailure { .. } => "Problem while logging out.".to_string(),
            AuthError::TokenAcquisition(err) => {
                format!("Problem while trying to get token: {}", err.message)
            }
            AuthError::CredentialCleanup { .. } => "Problem while logging out.".to_string(),
        }
    }
}

/// A failure reported by the identity provider.
///
/// Providers attach a machine-readable `code` (for example
/// `auth/wrong-password`) where they have one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", code_suffix(.code))]
pub struct ProviderError {
    /// Provider error code.
    pub code: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl ProviderError {
    /// Create a new provider error.
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Token refresh failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", code_suffix(.code))]
pub struct TokenRefreshError {
    /// Provider error code, if the provider supplied one.
    pub code: Option<String>,
    /// Description of the failure.
    pub message: String,
}

impl TokenRefreshError {
    /// Create a new token refresh error.
    pub fn new(code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ProviderError> for TokenRefreshError {
    fn from(err: ProviderError) -> Self {
        Self {
            code: err.code,
            message: err.message,
        }
    }
}

/// A non-success response from the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// HTTP status code.
    pub status: u16,
    /// The `error` field of the response body, if present.
    pub error: Option<String>,
}

impl RemoteError {
    /// Create a new remote error.
    pub fn new(status: u16, error: Option<String>) -> Self {
        Self { status, error }
    }

    /// Check whether the store reported an expired token.
    pub fn is_token_expired(&self) -> bool {
        self.error.as_deref() == Some(TOKEN_EXPIRED_SENTINEL)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref error) = self.error {
            write!(f, ": {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be decoded.
    #[error("invalid response body: {message}")]
    Decode { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Scoped storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing medium could not be read or written.
    #[error("I/O failure: {message}")]
    Io { message: String },

    /// Stored data could not be decoded.
    #[error("corrupt storage: {message}")]
    Corrupt { message: String },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration source was provided.
    #[error("no settings source configured")]
    Missing,

    /// The settings source could not be read.
    #[error("could not read settings from {source_name}: {message}")]
    Source { source_name: String, message: String },

    /// The settings did not have the expected shape.
    #[error("invalid settings: {message}")]
    Parse { message: String },

    /// The deployment environment name is not recognized.
    #[error("unknown environment '{name}'")]
    UnknownEnvironment { name: String },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid database path.
    #[error("invalid path '{value}': {reason}")]
    DbPath { value: String, reason: String },

    /// Invalid database URL.
    #[error("invalid database URL '{value}': {reason}")]
    DatabaseUrl { value: String, reason: String },

    /// Invalid API key.
    #[error("invalid API key: {reason}")]
    ApiKey { reason: String },

    /// Invalid user identifier.
    #[error("invalid user id: {reason}")]
    UserId { reason: String },

    /// Invalid multi-location update.
    #[error("invalid update: {reason}")]
    Update { reason: String },

    /// Invalid query parameter.
    #[error("invalid query parameter '{name}': {reason}")]
    QueryParam { name: String, reason: String },
}
