//! Identity provider trait.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::ProviderError;
use crate::tokens::IdToken;
use crate::types::UserId;
use crate::Credentials;

/// Provider error codes the session manager classifies.
pub mod codes {
    /// The secret did not match the identifier.
    pub const WRONG_PASSWORD: &str = "auth/wrong-password";
    /// No account exists for the identifier.
    pub const USER_NOT_FOUND: &str = "auth/user-not-found";
    /// The identifier/secret pair was rejected without saying which part.
    pub const INVALID_CREDENTIAL: &str = "auth/invalid-credential";
    /// The account has been disabled.
    pub const USER_DISABLED: &str = "auth/user-disabled";
    /// Too many attempts; the provider is throttling.
    pub const TOO_MANY_REQUESTS: &str = "auth/too-many-requests";
    /// The long-lived credential behind the session is no longer valid.
    pub const USER_TOKEN_EXPIRED: &str = "auth/user-token-expired";
    /// A token was requested with nobody signed in.
    pub const NO_CURRENT_USER: &str = "auth/no-current-user";
    /// The provider could not be reached.
    pub const NETWORK_REQUEST_FAILED: &str = "auth/network-request-failed";
    /// Any other provider-side failure.
    pub const INTERNAL_ERROR: &str = "auth/internal-error";
}

/// A user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUser {
    pub uid: UserId,
    pub email: Option<String>,
}

/// The provider's view of the current user; `None` when signed out.
pub type UserState = Option<ProviderUser>;

/// A remote identity provider.
///
/// The provider owns the ambient current user. State changes are pushed to
/// subscribers; they are the single source of truth for whether a user is
/// signed in.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate with an identifier and secret.
    ///
    /// On success the provider also publishes the new user state.
    async fn sign_in_with_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<ProviderUser, ProviderError>;

    /// Sign the current user out.
    ///
    /// On success the provider publishes `None`.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Subscribe to user-state changes.
    fn subscribe(&self) -> broadcast::Receiver<UserState>;

    /// Obtain a freshly minted id token for the ambient current user.
    async fn fresh_id_token(&self) -> Result<IdToken, ProviderError>;
}
