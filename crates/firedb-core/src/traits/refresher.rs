//! Token refresh seam between the database client and the session manager.

use async_trait::async_trait;

use crate::Result;

/// Something that can put a fresh credential token into the credential store.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Acquire a fresh token and store it.
    ///
    /// Failures are reported as [`Error::TokenRefresh`](crate::Error::TokenRefresh).
    async fn refresh_token(&self) -> Result<()>;
}
