//! # Error Handling
//!
//! Error taxonomy for the magnifier engine plus the severity classification
//! the capture loop logs with.
//!
//! ## Error Classification
//!
//! `HasSeverity` maps each error to a log level. Errors the loop absorbs
//! (a skipped frame, a frame rendered on the CPU) stay below `Error`; the
//! `Error` level is left for failures the caller sees from the builder,
//! `start` or `stop`.
//!
//! Out-of-range zoom levels and window sizes are never errors; the engine
//! clamps them silently.
//!
//! ## Usage
//!
//! ```rust
//! use zoomlens::error::{ErrorSeverity, HasSeverity, MagnifierError};
//!
//! let error = MagnifierError::capture_unavailable("screen recording permission revoked");
//! assert!(error.severity() < ErrorSeverity::Error);
//! ```

use thiserror::Error;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Expected during normal operation (a single dropped frame)
    Debug,
    /// Worth a note in the log, no action needed
    Info,
    /// Degraded operation, e.g. running on the fallback renderer
    Warning,
    /// The requested operation failed
    Error,
}

/// Main error type for magnifier operations.
#[derive(Error, Debug)]
pub enum MagnifierError {
    /// The capture collaborator returned no image.
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// The capture collaborator reported an error.
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// A render backend could not produce a frame.
    #[error("Render backend '{backend}' failed: {reason}")]
    Render { backend: &'static str, reason: String },

    /// No GPU adapter or device could be created.
    #[error("No GPU available: {0}")]
    NoGpuAvailable(String),

    /// A configuration document could not be interpreted.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The engine builder was missing a required collaborator.
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// `start()` was called outside a Tokio runtime.
    #[error("No Tokio runtime available to run the capture loop")]
    NoRuntime,

    /// I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MagnifierError {
    /// Create a capture-unavailable error
    pub fn capture_unavailable(reason: impl Into<String>) -> Self {
        Self::CaptureUnavailable(reason.into())
    }

    /// Wrap a collaborator error raised while capturing
    pub fn capture_failed(error: &anyhow::Error) -> Self {
        Self::CaptureFailed(format!("{error:#}"))
    }

    /// Create a render error for the named backend
    pub fn render(backend: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Render {
            backend,
            reason: reason.to_string(),
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::CaptureUnavailable(_) => "capture_unavailable",
            Self::CaptureFailed(_) => "capture_failed",
            Self::Render { .. } => "render",
            Self::NoGpuAvailable(_) => "no_gpu",
            Self::InvalidConfiguration(_) => "config",
            Self::MissingCollaborator(_) => "builder",
            Self::NoRuntime => "runtime",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

/// Trait for errors that have severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for MagnifierError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CaptureUnavailable(_) => ErrorSeverity::Debug,
            Self::NoGpuAvailable(_) => ErrorSeverity::Info,
            Self::CaptureFailed(_) | Self::Render { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }
}

impl From<ErrorSeverity> for log::Level {
    fn from(severity: ErrorSeverity) -> Self {
        match severity {
            ErrorSeverity::Debug => log::Level::Debug,
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
        }
    }
}

/// Result type for magnifier operations
pub type Result<T> = std::result::Result<T, MagnifierError>;
