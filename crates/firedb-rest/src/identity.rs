//! Firebase Auth identity provider over the Identity Toolkit and Secure
//! Token REST APIs.

use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use url::Url;

use firedb_core::error::{ConfigError, Error, ProviderError};
use firedb_core::traits::{IdentityProvider, ProviderUser, UserState, codes};
use firedb_core::{ApiKey, Credentials, IdToken, UserId};

use crate::http::{DEFAULT_TIMEOUT, build_client};

const IDENTITY_TOOLKIT: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN: &str = "https://securetoken.googleapis.com/v1";

const SIGN_IN_WITH_PASSWORD: &str = "accounts:signInWithPassword";
const TOKEN: &str = "token";

/// Base URLs of the Firebase Auth REST services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityEndpoints {
    pub identity_toolkit: String,
    pub secure_token: String,
}

impl Default for IdentityEndpoints {
    fn default() -> Self {
        Self {
            identity_toolkit: IDENTITY_TOOLKIT.to_string(),
            secure_token: SECURE_TOKEN.to_string(),
        }
    }
}

impl IdentityEndpoints {
    /// Endpoints of a Firebase Auth emulator at `base`, e.g.
    /// `http://127.0.0.1:9099`.
    pub fn emulator(base: &str) -> Result<Self, Error> {
        let url = Url::parse(base).map_err(|e| ConfigError::Parse {
            message: format!("invalid emulator URL '{}': {}", base, e),
        })?;
        let base = url.as_str().trim_end_matches('/');
        Ok(Self {
            identity_toolkit: format!("{}/identitytoolkit.googleapis.com/v1", base),
            secure_token: format!("{}/securetoken.googleapis.com/v1", base),
        })
    }

    fn endpoint(base: &str, method: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), method)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    refresh_token: String,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// What the provider needs to resume a signed-in user later.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedProviderSession {
    pub uid: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub refresh_token: String,
}

impl fmt::Debug for PersistedProviderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedProviderSession")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Email/password identity provider backed by Firebase Auth.
///
/// The provider keeps the ambient current user and its long-lived refresh
/// token in memory. Every call to
/// [`fresh_id_token`](IdentityProvider::fresh_id_token) exchanges the refresh
/// token for a newly minted id token.
pub struct RestIdentityProvider {
    client: reqwest::Client,
    api_key: ApiKey,
    endpoints: IdentityEndpoints,
    current: RwLock<Option<PersistedProviderSession>>,
    states: broadcast::Sender<UserState>,
}

impl RestIdentityProvider {
    pub fn new(api_key: ApiKey) -> Result<Self, Error> {
        Self::with_endpoints(api_key, IdentityEndpoints::default())
    }

    pub fn with_endpoints(api_key: ApiKey, endpoints: IdentityEndpoints) -> Result<Self, Error> {
        Self::with_endpoints_and_timeout(api_key, endpoints, DEFAULT_TIMEOUT)
    }

    pub fn with_endpoints_and_timeout(
        api_key: ApiKey,
        endpoints: IdentityEndpoints,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let (states, _) = broadcast::channel(16);
        Ok(Self {
            client: build_client(timeout)?,
            api_key,
            endpoints,
            current: RwLock::new(None),
            states,
        })
    }

    /// Resume a previously signed-in user and announce it to subscribers.
    pub fn restore(&self, session: PersistedProviderSession) {
        info!(uid = %session.uid, "Restoring provider session");
        let user = ProviderUser {
            uid: session.uid.clone(),
            email: session.email.clone(),
        };
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
        self.publish(Some(user));
    }

    /// The current user's resumable state, if anyone is signed in.
    pub fn session_record(&self) -> Option<PersistedProviderSession> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current_user(&self) -> UserState {
        self.session_record().map(|s| ProviderUser {
            uid: s.uid,
            email: s.email,
        })
    }

    fn publish(&self, state: UserState) {
        // No subscribers is not an error.
        let _ = self.states.send(state);
    }

    fn clear(&self) {
        let had_user = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if had_user {
            self.publish(None);
        }
    }

    async fn post_json<B, R>(&self, url: String, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + fmt::Debug,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if status.is_success() {
            return response.json::<R>().await.map_err(|e| {
                ProviderError::new(Some(codes::INTERNAL_ERROR), format!("invalid response: {}", e))
            });
        }

        let message = match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => envelope.error.message,
            Err(_) => format!("HTTP {}", status.as_u16()),
        };
        Err(classify(&message))
    }
}

fn network_error(err: reqwest::Error) -> ProviderError {
    ProviderError::new(Some(codes::NETWORK_REQUEST_FAILED), err.to_string())
}

/// Map a Firebase Auth error message to a provider error code.
///
/// Messages may carry detail after the code, e.g.
/// `TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been temporarily disabled`.
fn classify(message: &str) -> ProviderError {
    let reason = message
        .split(|c: char| c == ':' || c.is_whitespace())
        .next()
        .unwrap_or_default();

    let code = match reason {
        "INVALID_PASSWORD" => codes::WRONG_PASSWORD,
        "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => codes::USER_NOT_FOUND,
        "INVALID_LOGIN_CREDENTIALS" => codes::INVALID_CREDENTIAL,
        "USER_DISABLED" => codes::USER_DISABLED,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => codes::TOO_MANY_REQUESTS,
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" => codes::USER_TOKEN_EXPIRED,
        _ => codes::INTERNAL_ERROR,
    };
    ProviderError::new(Some(code), message)
}

/// Codes after which the stored user can no longer be resumed.
fn ends_session(err: &ProviderError) -> bool {
    matches!(
        err.code.as_deref(),
        Some(codes::USER_TOKEN_EXPIRED) | Some(codes::USER_DISABLED) | Some(codes::USER_NOT_FOUND)
    )
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    #[instrument(skip(self, credentials), fields(identifier = %credentials.identifier()))]
    async fn sign_in_with_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<ProviderUser, ProviderError> {
        debug!("Signing in with password");
        let request = SignInRequest {
            email: credentials.identifier(),
            password: credentials.secret(),
            return_secure_token: true,
        };

        let response: SignInResponse = self
            .post_json(
                IdentityEndpoints::endpoint(&self.endpoints.identity_toolkit, SIGN_IN_WITH_PASSWORD),
                &request,
            )
            .await?;

        let uid = UserId::new(response.local_id).map_err(|e| {
            ProviderError::new(Some(codes::INTERNAL_ERROR), e.to_string())
        })?;
        let email = Some(
            response
                .email
                .unwrap_or_else(|| credentials.identifier().to_string()),
        );

        self.restore(PersistedProviderSession {
            uid: uid.clone(),
            email: email.clone(),
            refresh_token: response.refresh_token,
        });
        Ok(ProviderUser { uid, email })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        debug!("Signing out");
        self.clear();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<UserState> {
        self.states.subscribe()
    }

    #[instrument(skip(self))]
    async fn fresh_id_token(&self) -> Result<IdToken, ProviderError> {
        let refresh_token = self
            .session_record()
            .map(|s| s.refresh_token)
            .ok_or_else(|| ProviderError::new(Some(codes::NO_CURRENT_USER), "no user is signed in"))?;

        let request = RefreshRequest {
            grant_type: "refresh_token",
            refresh_token: &refresh_token,
        };

        let result: Result<RefreshResponse, ProviderError> = self
            .post_json(
                IdentityEndpoints::endpoint(&self.endpoints.secure_token, TOKEN),
                &request,
            )
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                if ends_session(&err) {
                    warn!(error = %err, "Stored user can no longer be resumed");
                    self.clear();
                }
                return Err(err);
            }
        };

        if let Some(session) = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            session.refresh_token = response.refresh_token;
        }
        debug!("Minted fresh id token");
        Ok(IdToken::new(response.id_token))
    }
}

impl fmt::Debug for RestIdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestIdentityProvider")
            .field("endpoints", &self.endpoints)
            .field("current", &self.session_record())
            .finish()
    }
}
