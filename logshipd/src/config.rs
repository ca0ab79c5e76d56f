//! Shipper configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

use logship_connectors::Credentials;

use crate::error::{ShipError, ShipResult};

// =============================================================================
// Configuration
// =============================================================================

/// Shipper configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Log group to write to
    pub group: String,
    /// Log stream to write to
    pub stream: String,
    /// Service region
    pub region: String,
    /// Endpoint override (VPC endpoint, local emulator)
    pub endpoint: Option<String>,
    /// Background flush interval
    pub flush_every: Duration,
    /// Signing credentials
    pub credentials: Credentials,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> ShipResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ShipResult<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ShipError::Config(format!("{} is not set", key)))
        };

        let flush_ms = match lookup("LOGSHIP_FLUSH_INTERVAL_MS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ShipError::Config(format!("Invalid LOGSHIP_FLUSH_INTERVAL_MS: {}", raw))
            })?,
            None => 5_000,
        };
        if flush_ms == 0 {
            return Err(ShipError::Config(
                "LOGSHIP_FLUSH_INTERVAL_MS must be positive".to_string(),
            ));
        }

        Ok(Self {
            group: required("LOGSHIP_GROUP")?,
            stream: required("LOGSHIP_STREAM")?,
            region: lookup("LOGSHIP_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            endpoint: lookup("LOGSHIP_ENDPOINT").filter(|v| !v.is_empty()),
            flush_every: Duration::from_millis(flush_ms),
            credentials: Credentials {
                access_key_id: required("AWS_ACCESS_KEY_ID")?,
                secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
                session_token: lookup("AWS_SESSION_TOKEN").filter(|v| !v.is_empty()),
            },
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            group: "test-group".to_string(),
            stream: "test-stream".to_string(),
            endpoint: Some("http://127.0.0.1:4566".to_string()),
            flush_every: Duration::from_millis(100),
            credentials: Credentials {
                access_key_id: "test".to_string(),
                secret_access_key: "test".to_string(),
                session_token: None,
            },
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            group: String::new(),
            stream: String::new(),
            region: "us-east-1".to_string(),
            endpoint: None,
            flush_every: Duration::from_secs(5),
            credentials: Credentials {
                access_key_id: String::new(),
                secret_access_key: String::new(),
                session_token: None,
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
