//! Shipper error types.

use logship_connectors::ClientError;
use logship_writer::{ProvisionError, WriterError};
use thiserror::Error;

/// Shipper-level errors.
#[derive(Debug, Error)]
pub enum ShipError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Log service client could not be built
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Group or stream provisioning failed
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// The stream writer failed
    #[error("Writer error: {0}")]
    Writer(#[from] WriterError),

    /// Reading input failed
    #[error("Input error: {0}")]
    Input(#[from] std::io::Error),
}

/// Result type for shipper operations.
pub type ShipResult<T> = Result<T, ShipError>;
