//! Realtime Database REST transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use firedb_core::database::{Method, OutgoingRequest};
use firedb_core::error::{RemoteError, TransportError};
use firedb_core::{Result, Transport};

use crate::http::{DEFAULT_TIMEOUT, build_client, transport_error};

/// Failure body returned by the Realtime Database.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Sends requests to the Realtime Database REST API.
///
/// The credential travels as the `auth` query parameter. Non-success
/// responses become [`Error::Remote`](firedb_core::Error::Remote) carrying
/// the body's `error` field.
#[derive(Debug, Clone)]
pub struct RestTransport {
    client: reqwest::Client,
}

impl RestTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }

    /// Use an existing HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for RestTransport {
    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    async fn execute(&self, request: &OutgoingRequest) -> Result<Value> {
        debug!("Sending database request");

        let mut builder = self
            .client
            .request(http_method(request.method()), request.authorized_url());
        if let Some(body) = request.body() {
            builder = builder
                .header(CONTENT_TYPE, request.content_type())
                .json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;
        trace!(status = %status, len = bytes.len(), "Database response");

        if status.is_success() {
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes).map_err(|e| {
                TransportError::Decode {
                    message: e.to_string(),
                }
                .into()
            });
        }

        let error = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(|body| body.error);
        Err(RemoteError::new(status.as_u16(), error).into())
    }
}
