//! Scripted collaborators for exercising the session manager and database
//! client without a network.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::Result;
use crate::credentials::Credentials;
use crate::database::OutgoingRequest;
use crate::error::{Error, ProviderError, RemoteError, TOKEN_EXPIRED_SENTINEL, TokenRefreshError};
use crate::storage::ScopedStorage;
use crate::tokens::IdToken;
use crate::traits::{IdentityProvider, ProviderUser, TokenRefresher, Transport, UserState, codes};
use crate::types::UserId;

/// Identity provider that signs in `user-1` and mints `token-1`, `token-2`, ...
pub struct ScriptedProvider {
    states: broadcast::Sender<UserState>,
    sign_in_calls: AtomicUsize,
    token_calls: AtomicUsize,
    sign_in_failure: Mutex<Option<ProviderError>>,
    sign_out_failure: Mutex<Option<ProviderError>>,
    fail_tokens: AtomicBool,
    blank_token: AtomicBool,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        let (states, _) = broadcast::channel(16);
        Self {
            states,
            sign_in_calls: AtomicUsize::new(0),
            token_calls: AtomicUsize::new(0),
            sign_in_failure: Mutex::new(None),
            sign_out_failure: Mutex::new(None),
            fail_tokens: AtomicBool::new(false),
            blank_token: AtomicBool::new(false),
        }
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_sign_in(&self, err: ProviderError) {
        *self.sign_in_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_next_sign_out(&self, err: ProviderError) {
        *self.sign_out_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_tokens(&self, fail: bool) {
        self.fail_tokens.store(fail, Ordering::SeqCst);
    }

    pub fn next_token_is_blank(&self) {
        self.blank_token.store(true, Ordering::SeqCst);
    }

    pub fn publish(&self, state: UserState) {
        let _ = self.states.send(state);
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn sign_in_with_credentials(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<ProviderUser, ProviderError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.sign_in_failure.lock().unwrap().take() {
            return Err(err);
        }
        let user = ProviderUser {
            uid: UserId::new("user-1").unwrap(),
            email: Some(credentials.identifier().to_string()),
        };
        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> std::result::Result<(), ProviderError> {
        if let Some(err) = self.sign_out_failure.lock().unwrap().take() {
            return Err(err);
        }
        self.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<UserState> {
        self.states.subscribe()
    }

    async fn fresh_id_token(&self) -> std::result::Result<IdToken, ProviderError> {
        let n = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;

        if self.fail_tokens.load(Ordering::SeqCst) {
            return Err(ProviderError::new(Some(codes::NO_CURRENT_USER), "no user"));
        }
        if self.blank_token.swap(false, Ordering::SeqCst) {
            return Ok(IdToken::new(""));
        }
        Ok(IdToken::new(format!("token-{}", n)))
    }
}

/// Transport that records every request.
///
/// Requests carrying an expired token, or every request once
/// [`ScriptedTransport::always_expired`] is set, get the expiry response.
/// Otherwise queued responses are returned in order, then `null`.
pub struct ScriptedTransport {
    sent: Mutex<Vec<OutgoingRequest>>,
    responses: Mutex<VecDeque<Result<Value>>>,
    expired_tokens: Mutex<HashSet<String>>,
    always_expired: AtomicBool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            expired_tokens: Mutex::new(HashSet::new()),
            always_expired: AtomicBool::new(false),
        }
    }

    pub fn respond(&self, response: Result<Value>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn expire_token(&self, token: &str) {
        self.expired_tokens.lock().unwrap().insert(token.to_string());
    }

    pub fn always_expired(&self) {
        self.always_expired.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutgoingRequest> {
        self.sent.lock().unwrap().clone()
    }
}

fn expired() -> Error {
    RemoteError::new(401, Some(TOKEN_EXPIRED_SENTINEL.to_string())).into()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &OutgoingRequest) -> Result<Value> {
        self.sent.lock().unwrap().push(request.clone());

        if self.always_expired.load(Ordering::SeqCst)
            || self
                .expired_tokens
                .lock()
                .unwrap()
                .contains(request.token().as_str())
        {
            return Err(expired());
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }
}

/// Refresher that writes a fixed token straight into storage.
pub struct StaticRefresher {
    storage: Arc<dyn ScopedStorage>,
    key: String,
    calls: AtomicUsize,
    next_token: Mutex<Option<String>>,
    failure: Mutex<Option<String>>,
    store_nothing: AtomicBool,
    after_refresh: Mutex<Option<(Arc<dyn ScopedStorage>, String, String)>>,
}

impl StaticRefresher {
    pub fn new(storage: Arc<dyn ScopedStorage>, key: String) -> Self {
        Self {
            storage,
            key,
            calls: AtomicUsize::new(0),
            next_token: Mutex::new(None),
            failure: Mutex::new(None),
            store_nothing: AtomicBool::new(false),
            after_refresh: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_next_token(&self, token: &str) {
        *self.next_token.lock().unwrap() = Some(token.to_string());
    }

    pub fn fail_next(&self, code: &str) {
        *self.failure.lock().unwrap() = Some(code.to_string());
    }

    pub fn store_nothing(&self) {
        self.store_nothing.store(true, Ordering::SeqCst);
    }

    /// Simulate another writer replacing the token right after a refresh.
    pub fn after_refresh_store(&self, storage: Arc<dyn ScopedStorage>, key: String, token: &str) {
        *self.after_refresh.lock().unwrap() = Some((storage, key, token.to_string()));
    }
}

#[async_trait]
impl TokenRefresher for StaticRefresher {
    async fn refresh_token(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if let Some(code) = self.failure.lock().unwrap().take() {
            return Err(TokenRefreshError::new(Some(code), "refresh rejected").into());
        }
        if self.store_nothing.load(Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(token) = self.next_token.lock().unwrap().clone() {
            self.storage.set_item(&self.key, &token)?;
        }
        if let Some((storage, key, token)) = self.after_refresh.lock().unwrap().take() {
            storage.set_item(&key, &token)?;
        }
        Ok(())
    }
}
