//! Deployment events: the marker a deployment writes for each site, and the
//! event kinds a site context remembers having observed.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::identity::Timestamp;

/// Default path of the deployment marker, relative to the site's store root.
pub const DEFAULT_DEPLOYMENT_EVENTS_PATH: &str = "deployment-events.properties";

/// Marker key requesting a full context rebuild.
pub const REBUILD_CONTEXT_KEY: &str = "events.deployment.rebuildContext";

/// Marker key requesting a cache clear.
pub const CLEAR_CACHE_KEY: &str = "events.deployment.clearCache";

/// Events whose last-observed instant a site context tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SiteEventKind {
    /// Stamped when the context is constructed.
    ContextBuilt,
    /// Stamped when the context's cache scope is reset.
    CacheCleared,
}

impl fmt::Display for SiteEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextBuilt => f.write_str("CONTEXT_BUILT"),
            Self::CacheCleared => f.write_str("CACHE_CLEARED"),
        }
    }
}

/// Timestamps read from one site's deployment marker.
///
/// Not persisted anywhere by the engine; each poll reads it fresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEvents {
    pub rebuild_context: Option<Timestamp>,
    pub clear_cache: Option<Timestamp>,
}

impl DeploymentEvents {
    pub fn is_empty(&self) -> bool {
        self.rebuild_context.is_none() && self.clear_cache.is_none()
    }

    /// Parse the flat properties marker format.
    ///
    /// Follows `.properties` syntax: blank lines and `#`/`!` comments are
    /// skipped, a line ending in an odd number of backslashes continues on
    /// the next, the key ends at the first unescaped `=`, `:` or whitespace,
    /// and a key with no value is allowed. Unknown keys are ignored. A known
    /// key with an unparseable instant is an error.
    ///
    /// Instants are ISO-8601 with a `Z` or numeric offset, with or without
    /// seconds and fractional seconds.
    pub fn parse(input: &str) -> Result<Self, EventError> {
        let mut events = Self::default();

        for line in logical_lines(input) {
            let (key, value) = split_property(&line);

            let slot = match key.as_str() {
                REBUILD_CONTEXT_KEY => &mut events.rebuild_context,
                CLEAR_CACHE_KEY => &mut events.clear_cache,
                _ => continue,
            };

            if value.is_empty() {
                continue;
            }

            let instant = parse_instant(&value).ok_or_else(|| EventError::InvalidTimestamp {
                key: key.clone(),
                value: value.clone(),
            })?;
            *slot = Some(instant);
        }

        Ok(events)
    }

    /// Render back to the marker format.
    pub fn to_properties(&self) -> String {
        let mut out = String::new();
        if let Some(at) = self.rebuild_context {
            out.push_str(REBUILD_CONTEXT_KEY);
            out.push('=');
            out.push_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true));
            out.push('\n');
        }
        if let Some(at) = self.clear_cache {
            out.push_str(CLEAR_CACHE_KEY);
            out.push('=');
            out.push_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true));
            out.push('\n');
        }
        out
    }
}

/// Joins continued lines and drops blanks and comments. Continuation lines
/// lose their leading whitespace.
fn logical_lines(input: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending: Option<String> = None;

    for raw in input.lines() {
        let trimmed = raw.trim_start();
        let mut line = match pending.take() {
            Some(mut head) => {
                head.push_str(trimmed);
                head
            }
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                trimmed.to_string()
            }
        };

        let trailing = line.chars().rev().take_while(|&c| c == '\\').count();
        if trailing % 2 == 1 {
            line.pop();
            pending = Some(line);
        } else {
            lines.push(line);
        }
    }
    if let Some(line) = pending {
        lines.push(line);
    }
    lines
}

/// Split a logical line into unescaped key and value. The key ends at the
/// first unescaped `=`, `:` or whitespace; whitespace then at most one `=`
/// or `:` separate it from the value.
fn split_property(line: &str) -> (String, String) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = idx;
                break;
            }
            c if c.is_whitespace() => {
                key_end = idx;
                break;
            }
            _ => {}
        }
    }

    let mut rest = line[key_end..].trim_start();
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start();
    }
    (unescape(&line[..key_end]), unescape(rest.trim_end()))
}

/// RFC 3339 instants, plus the ISO-8601 form that leaves out seconds
/// (`2024-05-01T12:00Z`).
fn parse_instant(value: &str) -> Option<Timestamp> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }

    let bytes = value.as_bytes();
    let without_seconds = bytes.len() > 16
        && bytes[13] == b':'
        && matches!(bytes[16], b'Z' | b'z' | b'+' | b'-');
    if !without_seconds {
        return None;
    }
    let padded = format!("{}:00{}", &value[..16], &value[16..]);
    DateTime::parse_from_rfc3339(&padded)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
