//! Authentication session manager.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use async_trait::async_trait;
use chrono::Utc;
use futures_core::Stream;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::Result;
use crate::credentials::Credentials;
use crate::error::{AuthError, TokenRefreshError};
use crate::observer::{ObserverId, ObserverRegistry};
use crate::storage::CredentialStore;
use crate::tokens::IdToken;
use crate::traits::{IdentityProvider, TokenRefresher, UserState};
use crate::types::UserId;

use super::events::{AuthEvent, LoginAttempt, RefreshMode, Session, SessionStatus};

/// Owns the session, the credential token and the auth event channels.
///
/// Sign-in and sign-out only ask the identity provider to act. The session
/// itself is installed or removed when the provider publishes a user-state
/// change; those changes are applied by [`SessionManager::listen`] in the
/// background, or by [`SessionManager::process_user_state_changes`] when no
/// listener is running.
///
/// The manager is the only writer of the credential token.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    provider: Arc<dyn IdentityProvider>,
    credentials: CredentialStore,
    refresh_mode: RefreshMode,
    state: RwLock<ManagerState>,
    auth_observers: ObserverRegistry<AuthEvent>,
    login_observers: ObserverRegistry<LoginAttempt>,
    user_states: Mutex<Option<broadcast::Receiver<UserState>>>,
    login_pending: AtomicBool,
    refresh_gate: tokio::sync::Mutex<Option<std::result::Result<(), TokenRefreshError>>>,
    refresh_generation: AtomicU64,
    /// Bumped whenever the user goes away. Guards token writes so a refresh
    /// started before a sign-out cannot store its token afterwards.
    session_epoch: Mutex<u64>,
}

#[derive(Debug, Default)]
struct ManagerState {
    status: SessionStatus,
    last_error: Option<AuthError>,
}

impl SessionManager {
    /// Create a manager that refreshes independently for every caller.
    pub fn new(provider: Arc<dyn IdentityProvider>, credentials: CredentialStore) -> Self {
        Self::with_refresh_mode(provider, credentials, RefreshMode::default())
    }

    pub fn with_refresh_mode(
        provider: Arc<dyn IdentityProvider>,
        credentials: CredentialStore,
        refresh_mode: RefreshMode,
    ) -> Self {
        let user_states = provider.subscribe();
        Self {
            inner: Arc::new(ManagerInner {
                provider,
                credentials,
                refresh_mode,
                state: RwLock::new(ManagerState::default()),
                auth_observers: ObserverRegistry::new(),
                login_observers: ObserverRegistry::new(),
                user_states: Mutex::new(Some(user_states)),
                login_pending: AtomicBool::new(false),
                refresh_gate: tokio::sync::Mutex::new(None),
                refresh_generation: AtomicU64::new(0),
                session_epoch: Mutex::new(0),
            }),
        }
    }

    /// Observers of user presence and auth errors.
    pub fn auth_observers(&self) -> &ObserverRegistry<AuthEvent> {
        &self.inner.auth_observers
    }

    /// Observers of login attempt start and finish.
    pub fn login_attempt_observers(&self) -> &ObserverRegistry<LoginAttempt> {
        &self.inner.login_observers
    }

    /// Auth events as a stream.
    pub fn auth_events(&self) -> (ObserverId, impl Stream<Item = AuthEvent> + Send + 'static) {
        self.inner.auth_observers.stream()
    }

    pub fn status(&self) -> SessionStatus {
        self.read_state().status.clone()
    }

    /// The installed session, if any.
    pub fn current_user(&self) -> Option<Session> {
        self.read_state().status.session().cloned()
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self.read_state().status, SessionStatus::SignedIn(_))
    }

    /// Message for the most recent auth failure, suitable for end users.
    pub fn last_error(&self) -> Option<String> {
        self.read_state().last_error.as_ref().map(AuthError::user_message)
    }

    pub fn last_auth_error(&self) -> Option<AuthError> {
        self.read_state().last_error.clone()
    }

    /// The credential store this manager writes.
    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    /// Sign in with an identifier and secret.
    ///
    /// Fails with [`AuthError::AlreadyAuthenticated`] without contacting the
    /// provider if a session exists. On success, pending user-state changes
    /// are applied before returning unless a background listener owns the
    /// subscription.
    #[instrument(skip(self, credentials), fields(identifier = %credentials.identifier()))]
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<()> {
        self.inner.login_pending.store(true, Ordering::SeqCst);
        self.inner.login_observers.notify(&LoginAttempt::Started);

        if self.is_signed_in() {
            warn!("Sign-in requested with an active session");
            self.finish_login_attempt();
            self.fail(AuthError::AlreadyAuthenticated);
            return Err(AuthError::AlreadyAuthenticated.into());
        }

        match self
            .inner
            .provider
            .sign_in_with_credentials(credentials)
            .await
        {
            Ok(user) => {
                info!(uid = %user.uid, "Identity provider accepted credentials");
                self.process_user_state_changes().await;
                Ok(())
            }
            Err(provider_error) => {
                warn!(error = %provider_error, "Sign-in failed");
                let err = AuthError::classify_sign_in(&provider_error);
                self.finish_login_attempt();
                self.fail(err.clone());
                Err(err.into())
            }
        }
    }

    /// Ask the provider to sign out.
    ///
    /// Local state is only cleared when the provider reports that no user is
    /// present.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        match self.inner.provider.sign_out().await {
            Ok(()) => {
                info!("Identity provider signed out");
                self.process_user_state_changes().await;
                Ok(())
            }
            Err(provider_error) => {
                warn!(error = %provider_error, "Sign-out failed");
                let err = AuthError::SignOutFailure {
                    code: provider_error.code,
                };
                self.fail(err.clone());
                Err(err.into())
            }
        }
    }

    /// Acquire a fresh token for the provider's current user and store it.
    ///
    /// In [`RefreshMode::Coalesced`], a caller that had to wait for an
    /// acquisition already in flight returns that acquisition's outcome.
    #[instrument(skip(self), fields(mode = ?self.inner.refresh_mode))]
    pub async fn refresh_token(&self) -> Result<()> {
        let outcome = match self.inner.refresh_mode {
            RefreshMode::Independent => self.acquire_token().await.map(|_| ()),
            RefreshMode::Coalesced => {
                let seen = self.inner.refresh_generation.load(Ordering::SeqCst);
                let mut last = self.inner.refresh_gate.lock().await;
                let completed_while_waiting =
                    self.inner.refresh_generation.load(Ordering::SeqCst) != seen;

                match last.clone() {
                    Some(outcome) if completed_while_waiting => {
                        debug!("Reusing refresh completed while waiting");
                        outcome
                    }
                    _ => {
                        let outcome = self.acquire_token().await.map(|_| ());
                        *last = Some(outcome.clone());
                        self.inner.refresh_generation.fetch_add(1, Ordering::SeqCst);
                        outcome
                    }
                }
            }
        };

        if outcome.is_ok() {
            self.recover_degraded();
        }
        outcome.map_err(Into::into)
    }

    /// Apply user-state changes the provider has published so far.
    ///
    /// Returns the number of changes applied. Returns 0 if a background
    /// listener owns the subscription.
    pub async fn process_user_state_changes(&self) -> usize {
        let Some(mut receiver) = self.take_receiver() else {
            return 0;
        };

        let mut applied = 0;
        loop {
            match receiver.try_recv() {
                Ok(state) => {
                    self.handle_user_state(state).await;
                    applied += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed user-state changes");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        *self
            .inner
            .user_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(receiver);
        applied
    }

    /// Apply user-state changes in a background task until the provider
    /// goes away or the manager is dropped.
    ///
    /// Returns `None` if a listener is already running.
    pub fn listen(&self) -> Option<JoinHandle<()>> {
        let mut receiver = self.take_receiver()?;
        let weak: Weak<ManagerInner> = Arc::downgrade(&self.inner);

        Some(tokio::spawn(async move {
            loop {
                let state = match receiver.recv().await {
                    Ok(state) => state,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed user-state changes");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                SessionManager { inner }.handle_user_state(state).await;
            }
            debug!("User-state listener stopped");
        }))
    }

    /// React to one provider user-state change.
    #[instrument(skip(self, state), fields(present = state.is_some()))]
    pub async fn handle_user_state(&self, state: UserState) {
        match state {
            Some(user) => {
                match self.acquire_token().await {
                    Ok(_) => {
                        let session = Session {
                            user_id: user.uid.clone(),
                            email: user.email,
                            established_at: Utc::now(),
                        };
                        self.write_state().status = SessionStatus::SignedIn(session);
                        info!(uid = %user.uid, "Session established");
                        self.inner
                            .auth_observers
                            .notify(&AuthEvent::UserPresent(user.uid));
                    }
                    Err(err) => {
                        error!(uid = %user.uid, error = %err, "Token acquisition failed for present user");
                        {
                            let mut state = self.write_state();
                            state.status = SessionStatus::Degraded {
                                user_id: user.uid.clone(),
                            };
                            state.last_error = Some(AuthError::TokenAcquisition(err));
                        }
                        self.inner
                            .auth_observers
                            .notify(&AuthEvent::Degraded(user.uid));
                    }
                }
                self.finish_login_attempt();
            }
            None => {
                let cleared = {
                    let mut epoch = self.lock_epoch();
                    *epoch += 1;
                    self.inner.credentials.clear()
                };
                if let Err(err) = cleared {
                    error!(error = %err, "Could not remove credential token");
                    self.fail(AuthError::CredentialCleanup {
                        message: err.to_string(),
                    });
                    return;
                }
                self.write_state().status = SessionStatus::SignedOut;
                info!("Session ended");
                self.inner.auth_observers.notify(&AuthEvent::UserAbsent);
                self.finish_login_attempt();
            }
        }
    }

    async fn acquire_token(&self) -> std::result::Result<IdToken, TokenRefreshError> {
        let started_in = *self.lock_epoch();
        let token = self.inner.provider.fresh_id_token().await?;
        if token.is_empty() {
            return Err(TokenRefreshError::new(
                None,
                "identity provider returned an empty token",
            ));
        }

        let epoch = self.lock_epoch();
        if *epoch != started_in {
            warn!("User signed out while a token was being acquired; discarding it");
            return Err(TokenRefreshError::new(
                None,
                "user signed out while the token was being acquired",
            ));
        }
        self.inner
            .credentials
            .write(&token)
            .map_err(|e| TokenRefreshError::new(None, e.to_string()))?;
        drop(epoch);
        debug!("Stored fresh credential token");
        Ok(token)
    }

    fn recover_degraded(&self) {
        let user_id: UserId = {
            let mut state = self.write_state();
            let SessionStatus::Degraded { user_id } = &state.status else {
                return;
            };
            let user_id = user_id.clone();
            state.status = SessionStatus::SignedIn(Session {
                user_id: user_id.clone(),
                email: None,
                established_at: Utc::now(),
            });
            user_id
        };
        info!(uid = %user_id, "Session recovered after refresh");
        self.inner
            .auth_observers
            .notify(&AuthEvent::UserPresent(user_id));
    }

    fn fail(&self, err: AuthError) {
        self.write_state().last_error = Some(err.clone());
        self.inner.auth_observers.notify(&AuthEvent::Error(err));
    }

    fn finish_login_attempt(&self) {
        if self.inner.login_pending.swap(false, Ordering::SeqCst) {
            self.inner.login_observers.notify(&LoginAttempt::Finished);
        }
    }

    fn lock_epoch(&self) -> std::sync::MutexGuard<'_, u64> {
        self.inner
            .session_epoch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn take_receiver(&self) -> Option<broadcast::Receiver<UserState>> {
        self.inner
            .user_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ManagerState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, ManagerState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TokenRefresher for SessionManager {
    async fn refresh_token(&self) -> Result<()> {
        SessionManager::refresh_token(self).await
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("status", &self.read_state().status)
            .field("credentials", &self.inner.credentials)
            .field("refresh_mode", &self.inner.refresh_mode)
            .finish()
    }
}
