//! Error taxonomy for the scan workflow.
//!
//! Validation errors are caught before any network use. Submission
//! errors (application, server, network) carry a user-visible message
//! and are eligible for a manual retry. Location errors are never fatal
//! to a scan and live in their own type.

use thiserror::Error;

/// Fallback shown when the server gives no structured detail.
pub const FALLBACK_PROCESSING_MESSAGE: &str = "An error occurred while processing the image";

/// Fallback for a response that is not a usable prediction.
pub const INVALID_RESPONSE_MESSAGE: &str = "Invalid response from server";

/// Why a candidate image was rejected before upload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload a valid image file (JPG, JPEG, or PNG)")]
    InvalidType { mime_type: String },
    #[error("File size should not exceed 5MB")]
    TooLarge { size_bytes: u64, limit_bytes: u64 },
}

/// Errors surfaced by a prediction or history request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// 4xx with (or without) a `detail` message from the server.
    #[error("{detail}")]
    Application { status: u16, detail: String },
    /// 5xx. The body is ignored; `message` is the calling endpoint's
    /// fallback text.
    #[error("{message}")]
    Server { status: u16, message: String },
    /// No response, timeout, or a body that could not be understood.
    #[error("{message}")]
    Network { message: String },
}

impl ScanError {
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        ScanError::Server {
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        ScanError::Network {
            message: message.into(),
        }
    }

    /// Submission errors offer a retry; validation errors need a new file.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ScanError::Validation(_))
    }

    /// Text shown inline and in the notification banner.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::Validation(_) => "validation",
            ScanError::Application { .. } => "application",
            ScanError::Server { .. } => "server",
            ScanError::Network { .. } => "network",
        }
    }
}

/// Location acquisition failure. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("acquisition failed")]
    AcquisitionFailed { reason: String },
    /// Configured coordinates that no provider could ever report.
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

/// Failure while picking an image from a source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Permission needed: {0}")]
    PermissionDenied(String),
    #[error("No image found at {0}")]
    NoImage(String),
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid URL ({value}): {reason}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("{var} must be a positive number of seconds, got '{value}'")]
    InvalidSeconds { var: &'static str, value: String },
}

/// Failure while decoding or re-encoding an image before upload.
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("Image decode failed: {0}")]
    Decode(#[source] image::ImageError),
    #[error("JPEG encode failed: {0}")]
    Encode(#[source] image::ImageError),
}

/// Failure while reading or writing a history snapshot.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to access history file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse history file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize history for {path}: {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything a CLI command can fail with. Each maps to exit code 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Prepare(#[from] PrepareError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("Invalid location: {0}")]
    Location(#[from] LocationError),
    #[error("No scan with id {0}")]
    UnknownScan(String),
}
