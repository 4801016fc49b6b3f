//! Boundary to the remote log ingestion service.
//!
//! The service stores append-only streams of timestamped events. Streams live
//! inside log groups, and a group must exist before a stream can be created
//! in it.

use std::fmt;
use thiserror::Error;

/// One log line as submitted to the ingestion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub message: Vec<u8>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Error codes the ingestion service is known to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceErrorCode {
    ResourceNotFound,
    ResourceAlreadyExists,
    InvalidParameter,
    InvalidSequenceToken,
    DataAlreadyAccepted,
    LimitExceeded,
    ServiceUnavailable,
    Throttling,
    AccessDenied,
    UnrecognizedClient,
    Other(String),
}

impl ServiceErrorCode {
    /// Maps a wire error type such as `ResourceNotFoundException` or
    /// `com.amazonaws.logs#ResourceNotFoundException` to a code.
    pub fn from_type(error_type: &str) -> Self {
        let name = error_type.rsplit('#').next().unwrap_or(error_type);
        // Some gateways append ":<detail>" to the type.
        let name = name.split(':').next().unwrap_or(name).trim();
        match name {
            "ResourceNotFoundException" => Self::ResourceNotFound,
            "ResourceAlreadyExistsException" => Self::ResourceAlreadyExists,
            "InvalidParameterException" => Self::InvalidParameter,
            "InvalidSequenceTokenException" => Self::InvalidSequenceToken,
            "DataAlreadyAcceptedException" => Self::DataAlreadyAccepted,
            "LimitExceededException" => Self::LimitExceeded,
            "ServiceUnavailableException" => Self::ServiceUnavailable,
            "ThrottlingException" => Self::Throttling,
            "AccessDeniedException" => Self::AccessDenied,
            "UnrecognizedClientException" => Self::UnrecognizedClient,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ResourceNotFound => "ResourceNotFoundException",
            Self::ResourceAlreadyExists => "ResourceAlreadyExistsException",
            Self::InvalidParameter => "InvalidParameterException",
            Self::InvalidSequenceToken => "InvalidSequenceTokenException",
            Self::DataAlreadyAccepted => "DataAlreadyAcceptedException",
            Self::LimitExceeded => "LimitExceededException",
            Self::ServiceUnavailable => "ServiceUnavailableException",
            Self::Throttling => "ThrottlingException",
            Self::AccessDenied => "AccessDeniedException",
            Self::UnrecognizedClient => "UnrecognizedClientException",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ServiceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The service answered with an error it identified by type.
    #[error("{code}: {message}")]
    Service {
        code: ServiceErrorCode,
        message: String,
    },
    /// The failure could not be attributed to the service (transport
    /// failure, unreadable response).
    #[error("unclassified ingestion failure: {0}")]
    Unclassified(String),
}

impl IngestError {
    pub fn service(code: ServiceErrorCode, message: impl Into<String>) -> Self {
        Self::Service {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<&ServiceErrorCode> {
        match self {
            Self::Service { code, .. } => Some(code),
            Self::Unclassified(_) => None,
        }
    }

    pub fn is_already_exists(&self) -> bool {
        self.code() == Some(&ServiceErrorCode::ResourceAlreadyExists)
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(&ServiceErrorCode::ResourceNotFound)
    }
}

/// Client for the ingestion service. Implementations must be safe to call
/// from any thread; no synchronization is added on top of them.
pub trait LogIngestion: Send + Sync {
    fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), IngestError>;

    fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
    ) -> Result<(), IngestError>;
}
