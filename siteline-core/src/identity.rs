//! Identity types for Siteline sites

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Cache scope identifier using UUIDv7, so scopes sort by creation time.
pub type ScopeId = Uuid;

/// Maximum length of a site name.
pub const MAX_SITE_NAME_LEN: usize = 128;

static SITE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-][A-Za-z0-9_\-.]*$").expect("site name pattern is valid"));

/// Generate a new cache scope id.
pub fn new_scope_id() -> ScopeId {
    Uuid::now_v7()
}

/// Name of a site (tenant).
///
/// Validated once at construction and immutable afterwards; every
/// registry, cache scope and log line keys off this value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteName(String);

impl SiteName {
    /// Create a site name, validating its shape.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::InvalidSiteName {
                value,
                reason: "must not be empty".to_string(),
            });
        }
        if value.len() > MAX_SITE_NAME_LEN {
            return Err(ValidationError::InvalidSiteName {
                value,
                reason: format!("must be at most {} characters", MAX_SITE_NAME_LEN),
            });
        }
        if !SITE_NAME_PATTERN.is_match(&value) {
            return Err(ValidationError::InvalidSiteName {
                value,
                reason: "only letters, digits, '-', '_' and '.' are allowed, and it must not start with '.'"
                    .to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SiteName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SiteName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SiteName> for String {
    fn from(name: SiteName) -> Self {
        name.0
    }
}

impl AsRef<str> for SiteName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
