//! Log service client errors.

use logship_domain::SequenceToken;
use thiserror::Error;

/// Errors returned by any log service port.
///
/// The two sequencing conflicts carry the token the service expects next so
/// the caller can recover without another round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The supplied sequence token is not the stream's current token
    #[error("Invalid sequence token, expected {}", display_token(.expected))]
    InvalidSequenceToken { expected: Option<SequenceToken> },

    /// This exact batch was already accepted by an earlier call
    #[error("Data already accepted, next token {}", display_token(.expected))]
    DataAlreadyAccepted { expected: Option<SequenceToken> },

    /// Group or stream already exists
    #[error("Resource already exists: {0}")]
    ResourceAlreadyExists(String),

    /// Group or stream does not exist
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Request rate exceeded
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Any other error reported by the service
    #[error("Log service error: {code} - {message}")]
    Api { code: String, message: String },

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Failed to build the request signature
    #[error("Failed to build signature: {0}")]
    SignatureError(String),
}

/// Result type for log service calls.
pub type ClientResult<T> = Result<T, ClientError>;

fn display_token(token: &Option<SequenceToken>) -> String {
    token
        .as_ref()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "<none>".to_string())
}

impl ClientError {
    /// Classify an error body returned by the service.
    ///
    /// `code` may carry a namespace prefix (`com.amazonaws.logs#...`).
    /// When `expected_token` is missing, the token is recovered from the last
    /// word of the message, which is where the service prints it.
    pub fn from_api(code: &str, message: &str, expected_token: Option<&str>) -> Self {
        let code = code.rsplit('#').next().unwrap_or(code);
        let expected = || {
            SequenceToken::parse_optional(
                expected_token.or_else(|| message.split_whitespace().last()),
            )
        };

        match code {
            "InvalidSequenceTokenException" => Self::InvalidSequenceToken { expected: expected() },
            "DataAlreadyAcceptedException" => Self::DataAlreadyAccepted { expected: expected() },
            "ResourceAlreadyExistsException" => Self::ResourceAlreadyExists(message.to_string()),
            "ResourceNotFoundException" => Self::ResourceNotFound(message.to_string()),
            "ThrottlingException" | "LimitExceededException" => {
                Self::Throttled(message.to_string())
            }
            other => Self::Api {
                code: other.to_string(),
                message: message.to_string(),
            },
        }
    }

    /// True for the "already exists" outcome that provisioning swallows
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::ResourceAlreadyExists(_))
    }
}
