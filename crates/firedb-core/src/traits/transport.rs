//! Document store transport trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;
use crate::database::OutgoingRequest;

/// Sends fully built requests to the document store.
///
/// Implementations report non-success responses as
/// [`Error::Remote`](crate::Error::Remote), carrying the `error` field of the
/// response body so the client can recognize the token-expiry signal. An empty
/// success body decodes to `Value::Null`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &OutgoingRequest) -> Result<Value>;
}
