//! Value Objects for the logship domain
//!
//! Immutable, validated primitives. Identities are checked at construction
//! time so that malformed names never reach the network.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a group or stream name accepted by the log service.
const MAX_NAME_LEN: usize = 512;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Group name is empty, too long, or uses a forbidden character
    #[error("Invalid group name: {0}")]
    InvalidGroupName(String),

    /// Stream name is empty, too long, or uses a forbidden character
    #[error("Invalid stream name: {0}")]
    InvalidStreamName(String),

    /// Sequence token was empty
    #[error("Invalid sequence token: {0}")]
    InvalidSequenceToken(String),
}

/// Result type for domain validation.
pub type DomainResult<T> = Result<T, DomainError>;

// =============================================================================
// SequenceToken
// =============================================================================

/// Opaque continuation token issued by the log service after every accepted
/// append. The next append to the same stream must carry it.
///
/// # Invariants
/// - Never empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceToken(String);

impl SequenceToken {
    /// Create a new token with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidSequenceToken` if the value is blank
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidSequenceToken("token must not be blank".to_string()));
        }
        Ok(Self(value))
    }

    /// Parse a token as it appears in service payloads.
    ///
    /// The service spells "no token yet" as an absent field, an empty string
    /// or the literal `null`; all three map to `None`.
    pub fn parse_optional(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") | Some("null") => None,
            Some(value) => Some(Self(value.to_string())),
        }
    }

    /// Get the raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SequenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// StreamIdentity
// =============================================================================

/// The (group, stream) pair addressed by one writer or reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamIdentity {
    group_name: String,
    stream_name: String,
}

impl StreamIdentity {
    /// Create a validated identity.
    ///
    /// Group names allow `[A-Za-z0-9._/#-]`; stream names allow anything
    /// except `:` and `*`. Both must be 1..=512 characters.
    pub fn new(group_name: impl Into<String>, stream_name: impl Into<String>) -> DomainResult<Self> {
        let group_name = validate_group_name(group_name.into())?;
        let stream_name = validate_stream_name(stream_name.into())?;
        Ok(Self { group_name, stream_name })
    }

    /// Log group name
    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    /// Log stream name
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }
}

impl fmt::Display for StreamIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_name, self.stream_name)
    }
}

/// Validate a log group name on its own (used by group provisioning).
pub fn validate_group_name(name: String) -> DomainResult<String> {
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::InvalidGroupName(format!(
            "'{}' must be 1..={} characters",
            name, MAX_NAME_LEN
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/' | '#');
    if let Some(bad) = name.chars().find(|c| !allowed(*c)) {
        return Err(DomainError::InvalidGroupName(format!(
            "'{}' contains forbidden character '{}'",
            name, bad
        )));
    }
    Ok(name)
}

fn validate_stream_name(name: String) -> DomainResult<String> {
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::InvalidStreamName(format!(
            "'{}' must be 1..={} characters",
            name, MAX_NAME_LEN
        )));
    }
    if let Some(bad) = name.chars().find(|c| matches!(c, ':' | '*')) {
        return Err(DomainError::InvalidStreamName(format!(
            "'{}' contains forbidden character '{}'",
            name, bad
        )));
    }
    Ok(name)
}

// =============================================================================
// Tests
// =============================================================================
