//! Session state and the events the session manager broadcasts.

use chrono::{DateTime, Utc};

use crate::error::AuthError;
use crate::types::UserId;

/// Events on the user-presence channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session was installed for this user.
    UserPresent(UserId),
    /// The session ended and the credential token is gone.
    UserAbsent,
    /// The provider reports a user but no token could be acquired.
    Degraded(UserId),
    /// An auth operation failed.
    Error(AuthError),
}

/// Events on the login-attempt channel, for UI progress indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAttempt {
    Started,
    Finished,
}

/// The authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub email: Option<String>,
    pub established_at: DateTime<Utc>,
}

/// What the session manager currently believes about the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    SignedOut,
    SignedIn(Session),
    /// The provider has a user, but token acquisition failed. No session is
    /// installed until a refresh succeeds.
    Degraded { user_id: UserId },
}

impl SessionStatus {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionStatus::SignedIn(session) => Some(session),
            _ => None,
        }
    }
}

/// How concurrent token refreshes are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshMode {
    /// Every caller performs its own acquisition.
    #[default]
    Independent,
    /// Callers arriving while an acquisition is in flight wait for it and
    /// reuse its result.
    Coalesced,
}
