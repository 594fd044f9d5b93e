//! Error types for the parcel lookup engine.
//!
//! Only configuration problems are ever returned to the caller as errors.
//! Everything that goes wrong while talking to a feature service is captured
//! per filter expression as a [`ChunkError`] and surfaced as a diagnostic, so a
//! bulk lookup always yields whatever succeeded.
//!
//! # Transport error classification
//!
//! | Error | Retried | Typical cause |
//! |-------|---------|---------------|
//! | Timeout | yes | connect or read timeout |
//! | Connect | yes | refused, reset, DNS failure |
//! | Status 5xx | yes | overloaded map server |
//! | Status 4xx | no | malformed `where` clause, URL too long |
//! | Service 5xx | yes | ArcGIS in-body error with a server code |
//! | Service other | no | ArcGIS in-body error with a client code |
//! | Decode | no | body is not the expected JSON |

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::jurisdiction::Jurisdiction;

/// Invalid engine configuration.
///
/// This is a programmer error: it is raised when the engine is constructed,
/// never during a search.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A numeric setting is outside its allowed range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: u64,
        max: u64,
        value: u64,
    },

    /// A jurisdiction layer URL could not be parsed.
    #[error("invalid layer url for {jurisdiction}: {url} ({message})")]
    InvalidLayerUrl {
        jurisdiction: Jurisdiction,
        url: String,
        message: String,
    },

    /// A jurisdiction has an empty identifier field name.
    #[error("identifier field for {jurisdiction} cannot be empty")]
    EmptyIdField { jurisdiction: Jurisdiction },

    /// The retry backoff multiplier is not usable.
    #[error("backoff multiplier must be at least 1.0, got {value}")]
    InvalidBackoffMultiplier { value: f64 },

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {message}")]
    HttpClient { message: String },
}

/// Errors produced by a single request to a feature service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Connect or read timeout.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// The connection could not be established or was reset.
    #[error("connection failed: {message}")]
    Connect { message: String },

    /// The service answered with a non-success HTTP status.
    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered 200 but the body carries an ArcGIS error object.
    #[error("service error {code}: {message}")]
    Service { code: i64, message: String },

    /// The body could not be decoded into the expected shape.
    #[error("malformed response: {message}")]
    Decode { message: String },
}

impl TransportError {
    /// Returns true if the request may succeed when retried.
    ///
    /// Timeouts, connection failures and server-side (5xx) failures are
    /// transient. Client errors (4xx) and undecodable bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Timeout { .. } | TransportError::Connect { .. } => true,
            TransportError::Status { status, .. } => *status >= 500,
            TransportError::Service { code, .. } => *code >= 500,
            TransportError::Decode { .. } => false,
        }
    }

    /// Creates a decode error from anything displayable.
    pub fn decode(message: impl std::fmt::Display) -> Self {
        TransportError::Decode {
            message: message.to_string(),
        }
    }
}

/// A filter expression that could not be executed.
///
/// Isolated to its expression: sibling chunks and other jurisdictions carry on.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{jurisdiction} query failed after {attempts} attempt(s): {source}")]
pub struct ChunkError {
    pub jurisdiction: Jurisdiction,
    /// The `where` clause that failed, kept verbatim for reproducibility.
    pub expression: String,
    pub attempts: u32,
    #[source]
    pub source: TransportError,
}

/// Result type alias for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            TransportError::Decode {
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            // connect, body, request and redirect failures are all network-level
            TransportError::Connect {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::decode(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(
            TransportError::Timeout {
                message: "read".to_string()
            }
            .is_transient()
        );
        assert!(
            TransportError::Connect {
                message: "reset".to_string()
            }
            .is_transient()
        );
        assert!(
            TransportError::Status {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !TransportError::Status {
                status: 400,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !TransportError::Status {
                status: 414,
                body: String::new()
            }
            .is_transient()
        );
        assert!(!TransportError::decode("eof").is_transient());
    }

    #[test]
    fn test_service_error_classification() {
        let server = TransportError::Service {
            code: 500,
            message: "Error performing query operation".to_string(),
        };
        assert!(server.is_transient());

        let client = TransportError::Service {
            code: 400,
            message: "Invalid or missing input parameters.".to_string(),
        };
        assert!(!client.is_transient());
    }

    #[test]
    fn test_chunk_error_display() {
        let err = ChunkError {
            jurisdiction: Jurisdiction::Nsw,
            expression: "UPPER(lotidstring) IN ('1//DP1')".to_string(),
            attempts: 4,
            source: TransportError::Status {
                status: 503,
                body: "unavailable".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "NSW query failed after 4 attempt(s): http status 503: unavailable"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::OutOfRange {
            field: "concurrency".to_string(),
            min: 1,
            max: 8,
            value: 0,
        };
        assert_eq!(err.to_string(), "concurrency must be between 1 and 8, got 0");
    }
}
