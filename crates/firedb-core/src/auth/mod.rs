//! Authentication session management.

mod events;
mod manager;

pub use events::{AuthEvent, LoginAttempt, RefreshMode, Session, SessionStatus};
pub use manager::SessionManager;
