//! Shared HTTP client setup and error mapping.

use std::time::Duration;

use firedb_core::error::{Error, TransportError};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client used by the REST backends.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .user_agent(concat!("firedb/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(transport_error)
}

/// Map a reqwest failure onto the transport error taxonomy.
pub fn transport_error(err: reqwest::Error) -> Error {
    let err = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else if err.is_decode() {
        TransportError::Decode {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(err)
}
