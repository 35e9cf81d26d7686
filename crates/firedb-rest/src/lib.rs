//! firedb-rest - REST backends for firedb.
//!
//! [`RestTransport`] talks to the Realtime Database REST API and
//! [`RestIdentityProvider`] to the Firebase Auth REST APIs. [`FirebaseApp`]
//! wires both into a session manager and database client.

pub mod app;
pub mod http;
pub mod identity;
pub mod transport;

pub use app::{AppOptions, FirebaseApp};
pub use identity::{IdentityEndpoints, PersistedProviderSession, RestIdentityProvider};
pub use transport::RestTransport;
