//! Credential token type.

use std::fmt;

/// A short-lived bearer token authorizing document store requests.
///
/// Expiry is opaque to this crate: it is discovered only when the store
/// rejects a request.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque; do not parse or inspect
#[derive(Clone, PartialEq, Eq)]
pub struct IdToken(String);

impl IdToken {
    /// Create a new token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in request URLs.
    ///
    /// # Security
    ///
    /// Use only when constructing outgoing requests or persisting the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the empty token, which counts as no token at all.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

// Hide token value in Debug output
impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IdToken").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_token_hides_value_in_debug() {
        let token = IdToken::new("eyJhbGciOiJSUzI1NiIsImtpZCI6IjEifQ...");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("eyJ"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn blank_token_is_empty() {
        assert!(IdToken::new("").is_empty());
        assert!(IdToken::new("  ").is_empty());
        assert!(!IdToken::new("abc").is_empty());
    }
}
