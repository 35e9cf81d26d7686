//! Collaborator traits consumed by the session manager and database client.

mod identity;
mod refresher;
mod transport;

pub use identity::{IdentityProvider, ProviderUser, UserState, codes};
pub use refresher::TokenRefresher;
pub use transport::Transport;
