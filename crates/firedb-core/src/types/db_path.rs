//! Database path type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// Maximum length of a single key, in bytes.
const MAX_KEY_BYTES: usize = 768;

/// Characters the Realtime Database forbids in keys.
const FORBIDDEN: &[char] = &['.', '$', '#', '[', ']'];

/// A validated location in the remote document tree.
///
/// Paths are normalized to a leading `/` and no trailing `/`; the root
/// location is `/`.
///
/// # Example
///
/// ```
/// use firedb_core::DbPath;
///
/// let path = DbPath::new("pages/home/").unwrap();
/// assert_eq!(path.as_str(), "/pages/home");
/// assert!(DbPath::new("pages/home.html").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DbPath(String);

impl DbPath {
    /// Create a new path, validating every segment.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let trimmed = s.trim_matches('/');

        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        for segment in trimmed.split('/') {
            Self::validate_segment(segment, s)?;
        }

        Ok(Self(format!("/{}", trimmed)))
    }

    /// The root location.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Returns true for the root location.
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns the normalized path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the path without its leading slash, as used for update keys.
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.relative().split('/').filter(|s| !s.is_empty())
    }

    /// Returns the final segment, or `None` for the root.
    pub fn key(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Append a child segment.
    pub fn child(&self, segment: &str) -> Result<Self, Error> {
        if segment.contains('/') {
            return Err(InvalidInputError::DbPath {
                value: segment.to_string(),
                reason: "a child key cannot contain '/'".to_string(),
            }
            .into());
        }
        Self::validate_segment(segment, segment)?;
        if self.is_root() {
            Ok(Self(format!("/{}", segment)))
        } else {
            Ok(Self(format!("{}/{}", self.0, segment)))
        }
    }

    /// Returns true if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &DbPath) -> bool {
        if self == other {
            return false;
        }
        if self.is_root() {
            return true;
        }
        other
            .0
            .strip_prefix(&self.0)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Returns true if the two locations are equal or one contains the other.
    pub fn overlaps(&self, other: &DbPath) -> bool {
        self == other || self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }

    fn validate_segment(segment: &str, original: &str) -> Result<(), Error> {
        let invalid = |reason: &str| -> Error {
            InvalidInputError::DbPath {
                value: original.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        if segment.is_empty() {
            return Err(invalid("empty path segment"));
        }
        if segment.len() > MAX_KEY_BYTES {
            return Err(invalid("key longer than 768 bytes"));
        }
        if segment.contains(FORBIDDEN) {
            return Err(invalid("keys cannot contain '.', '$', '#', '[' or ']'"));
        }
        if segment.chars().any(|c| c.is_ascii_control()) {
            return Err(invalid("keys cannot contain control characters"));
        }

        Ok(())
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DbPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for DbPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DbPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DbPath::new(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for DbPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
