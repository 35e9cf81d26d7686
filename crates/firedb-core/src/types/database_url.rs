//! Database URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

use super::DbPath;

/// A validated Realtime Database base URL.
///
/// This type ensures the URL is absolute and uses HTTPS (or HTTP for
/// localhost emulators), and builds the `<base><path>.json` resource
/// locations of the REST API.
///
/// # Example
///
/// ```
/// use firedb_core::{DatabaseUrl, DbPath};
///
/// let db = DatabaseUrl::new("https://demo-app.firebaseio.com").unwrap();
/// let path = DbPath::new("pages/home").unwrap();
/// assert_eq!(
///     db.resource_url(&path).as_str(),
///     "https://demo-app.firebaseio.com/pages/home.json"
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatabaseUrl(Url);

impl DatabaseUrl {
    /// Create a new database URL from a string, validating the format.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::DatabaseUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        Ok(Self(url))
    }

    /// Returns the REST resource URL for a location: `<base><path>.json`.
    ///
    /// The base URL's query, such as the emulator's `?ns=<project>`, is kept.
    pub fn resource_url(&self, path: &DbPath) -> Url {
        let mut url = self.0.clone();
        url.set_fragment(None);

        let segments: Vec<&str> = path.segments().collect();
        // Validated as a base URL, so path segments are always available.
        if let Ok(mut parts) = url.path_segments_mut() {
            parts.pop_if_empty();
            match segments.split_last() {
                Some((last, parents)) => {
                    parts.extend(parents);
                    parts.push(&format!("{}.json", last));
                }
                None => {
                    parts.push(".json");
                }
            }
        }

        url
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the inner URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        let invalid = |reason: &str| -> Error {
            InvalidInputError::DatabaseUrl {
                value: original.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        if url.cannot_be_a_base() {
            return Err(invalid("must be an absolute URL"));
        }

        // Must be HTTPS (or HTTP for localhost)
        let scheme = url.scheme();
        let is_localhost = url
            .host_str()
            .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "[::1]");

        if scheme != "https" && !(scheme == "http" && is_localhost) {
            return Err(invalid("must use HTTPS (HTTP allowed only for localhost)"));
        }

        if url.host_str().is_none() {
            return Err(invalid("must have a host"));
        }

        Ok(())
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatabaseUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for DatabaseUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for DatabaseUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DatabaseUrl::new(&s).map_err(serde::de::Error::custom)
    }
}
