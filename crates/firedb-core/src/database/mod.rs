//! Token-aware access to the Realtime Database.

mod client;
mod request;


pub use client::DatabaseClient;
pub use request::{CONTENT_TYPE_JSON, GetOptions, Method, OutgoingRequest, PendingRequest, RequestState};
