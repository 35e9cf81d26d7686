//! Request descriptions and their lifecycle.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Error, InvalidInputError};
use crate::tokens::IdToken;
use crate::types::{DatabaseUrl, DbPath};

/// Content type sent with every request.
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";

/// Query parameters the client sets itself.
const RESERVED_PARAMS: &[&str] = &["auth", "shallow"];

/// HTTP method of a document store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for reads.
///
/// # Example
///
/// ```
/// use firedb_core::GetOptions;
///
/// let options = GetOptions::new()
///     .shallow()
///     .param("orderBy", "\"$key\"")
///     .unwrap();
/// assert!(options.is_shallow());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    shallow: bool,
    params: BTreeMap<String, String>,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only enumerate the immediate children; their values come back as `{}`.
    pub fn shallow(mut self) -> Self {
        self.shallow = true;
        self
    }

    /// Add an extra query parameter such as `orderBy` or `limitToFirst`.
    ///
    /// `auth` and `shallow` are managed by the client and rejected here.
    pub fn param(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() || RESERVED_PARAMS.contains(&name.as_str()) {
            return Err(InvalidInputError::QueryParam {
                name,
                reason: "reserved or empty parameter name".to_string(),
            }
            .into());
        }
        self.params.insert(name, value.into());
        Ok(self)
    }

    pub fn is_shallow(&self) -> bool {
        self.shallow
    }

    /// Extra parameters in name order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// An immutable description of one document store operation.
///
/// A retry builds a second [`OutgoingRequest`] from the same description; the
/// description itself never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    method: Method,
    path: DbPath,
    payload: Option<Value>,
    options: GetOptions,
}

impl PendingRequest {
    pub fn get(path: DbPath, options: GetOptions) -> Self {
        Self {
            method: Method::Get,
            path,
            payload: None,
            options,
        }
    }

    pub fn put(path: DbPath, payload: Value) -> Self {
        Self::write(Method::Put, path, payload)
    }

    pub fn post(path: DbPath, payload: Value) -> Self {
        Self::write(Method::Post, path, payload)
    }

    /// A multi-location update applied atomically at the root.
    pub fn update(payload: Value) -> Self {
        Self::write(Method::Patch, DbPath::root(), payload)
    }

    pub fn delete(path: DbPath) -> Self {
        Self {
            method: Method::Delete,
            path,
            payload: None,
            options: GetOptions::default(),
        }
    }

    fn write(method: Method, path: DbPath, payload: Value) -> Self {
        Self {
            method,
            path,
            payload: Some(payload),
            options: GetOptions::default(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &DbPath {
        &self.path
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn options(&self) -> &GetOptions {
        &self.options
    }

    /// Build the request to put on the wire with the given token.
    pub fn build(&self, database: &DatabaseUrl, token: IdToken) -> OutgoingRequest {
        let mut url = database.resource_url(&self.path);
        {
            let mut query = url.query_pairs_mut();
            if self.options.shallow {
                query.append_pair("shallow", "true");
            }
            for (name, value) in self.options.params() {
                query.append_pair(name, value);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        OutgoingRequest {
            method: self.method,
            url,
            token,
            body: self.payload.clone(),
        }
    }
}

/// A request ready to send: the description plus the token captured at
/// send time.
#[derive(Clone)]
pub struct OutgoingRequest {
    method: Method,
    url: Url,
    token: IdToken,
    body: Option<Value>,
}

impl OutgoingRequest {
    pub fn method(&self) -> Method {
        self.method
    }

    /// Resource URL without the credential.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Resource URL with the `auth` credential appended.
    pub fn authorized_url(&self) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("auth", self.token.as_str());
        url
    }

    pub fn token(&self) -> &IdToken {
        &self.token
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Content type header value for this request.
    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE_JSON
    }
}

impl fmt::Debug for OutgoingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutgoingRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("token", &"[REDACTED]")
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// States a request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Init,
    TokenCheck,
    Sending,
    TokenExpired,
    Refreshing,
    Resending,
    Succeeded,
    Failed,
}

/// Tracks one request's state and enforces the single-retry rule.
#[derive(Debug)]
pub(crate) struct RequestLifecycle {
    method: Method,
    path: String,
    state: RequestState,
    retried: bool,
}

impl RequestLifecycle {
    pub(crate) fn new(request: &PendingRequest) -> Self {
        Self {
            method: request.method,
            path: request.path.to_string(),
            state: RequestState::Init,
            retried: false,
        }
    }

    pub(crate) fn state(&self) -> RequestState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: RequestState) {
        debug!(method = %self.method, path = %self.path, from = ?self.state, to = ?next, "Request state");
        self.state = next;
    }

    /// Mark the single retry as used.
    ///
    /// A second call means the store kept reporting expiry after the retry.
    pub(crate) fn begin_retry(&mut self) -> Result<(), Error> {
        if self.retried {
            self.advance(RequestState::Failed);
            return Err(Error::TokenExpiredRetryExhausted {
                method: self.method.as_str(),
                path: self.path.clone(),
            });
        }
        self.retried = true;
        self.advance(RequestState::Refreshing);
        Ok(())
    }

    pub(crate) fn finish<T>(&mut self, result: &Result<T, Error>) {
        let next = if result.is_ok() {
            RequestState::Succeeded
        } else {
            RequestState::Failed
        };
        self.advance(next);
    }
}
