//! # Error Handling
//!
//! Every failure in the grading pipeline is a [`GradeError`]. Variants follow the
//! stages of a capture run so the coordinator can tell the user what went wrong
//! without inspecting strings:
//!
//! - **Capture**: the photo could not be obtained (missing file, permission)
//! - **Preprocessing**: the photo could not be decoded, scaled or re-encoded
//! - **Network / Timeout**: the grading request never got a response
//! - **Grading**: a response arrived but carried no usable verdict
//! - **Storage**: the upload history could not be read or written
//! - **Config / State / Cancelled**: setup problems and workflow misuse
//!
//! Nothing here is fatal to the process. Each error carries an [`ErrorContext`]
//! with a severity and an optional recovery suggestion that the CLI prints.
//!
//! ```rust
//! use card_grade::error::{GradeError, HasRecoverySuggestion};
//!
//! let error = GradeError::preprocessing("decode", "unsupported image format")
//!     .with_context("reading IMG_0042.jpg")
//!     .with_recovery_suggestion("Retake the photo as a JPEG or PNG");
//!
//! assert_eq!(error.category(), "preprocessing");
//! assert_eq!(error.recovery_suggestion(), Some("Retake the photo as a JPEG or PNG"));
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, the run can be repeated as-is
    Info,
    /// Warnings that may indicate potential issues
    Warning,
    /// The run failed and needs user action before it is repeated
    Error,
    /// Local state is unusable (database, configuration)
    Critical,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.recovery_suggestion = Some(suggestion.into());
        self
    }
}

/// Base error type for the card grading library
#[derive(Debug)]
pub enum GradeError {
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// The capture source could not produce a photo
    Capture {
        source_name: String,
        reason: String,
        context: ErrorContext,
    },
    /// Decode, orientation, scaling or encode failures
    Preprocessing {
        operation: String,
        reason: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// Transport failures talking to the grading service
    Network {
        operation: String,
        address: Option<String>,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// The grading request exceeded its deadline
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },
    /// The grading service answered without a usable verdict
    Grading {
        reason: String,
        context: ErrorContext,
    },
    /// Upload history errors
    Storage {
        operation: String,
        source: rusqlite::Error,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// Invalid workflow state transitions
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// The run was cancelled before the grading call was issued
    Cancelled {
        stage: String,
        context: ErrorContext,
    },
}

impl GradeError {
    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Critical),
        }
    }

    /// Create a capture error
    pub fn capture(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Capture {
            source_name: source_name.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create a preprocessing error
    pub fn preprocessing(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Preprocessing {
            operation: operation.into(),
            reason: reason.into(),
            source: None,
            context: ErrorContext::new(),
        }
    }

    /// Create a preprocessing error wrapping the library error that caused it
    pub fn preprocessing_from(
        operation: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Preprocessing {
            operation: operation.into(),
            reason: source.to_string(),
            source: Some(Box::new(source)),
            context: ErrorContext::new(),
        }
    }

    /// Create a network error
    pub fn network(operation: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            address: None,
            source: None,
            context: ErrorContext::new(),
        }
    }

    /// Attach the remote address to a network error
    pub fn with_address(mut self, addr: impl Into<String>) -> Self {
        if let Self::Network { address, .. } = &mut self {
            *address = Some(addr.into());
        }
        self
    }

    /// Attach the underlying cause to a network error
    pub fn with_source(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        if let Self::Network { source, .. } = &mut self {
            *source = Some(Box::new(cause));
        }
        self
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create a grading error
    pub fn grading(reason: impl Into<String>) -> Self {
        Self::Grading {
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create a storage error
    pub fn storage(operation: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Storage {
            operation: operation.into(),
            source,
            context: ErrorContext::new().with_severity(ErrorSeverity::Critical),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Attach a path to an I/O error
    pub fn with_path(mut self, p: impl Into<String>) -> Self {
        if let Self::Io { path, .. } = &mut self {
            *path = Some(p.into());
        }
        self
    }

    /// Create a state error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(stage: impl Into<String>) -> Self {
        Self::Cancelled {
            stage: stage.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Info),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Set severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Capture { context, .. } => context,
            Self::Preprocessing { context, .. } => context,
            Self::Network { context, .. } => context,
            Self::Timeout { context, .. } => context,
            Self::Grading { context, .. } => context,
            Self::Storage { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Cancelled { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Capture { context, .. } => context,
            Self::Preprocessing { context, .. } => context,
            Self::Network { context, .. } => context,
            Self::Timeout { context, .. } => context,
            Self::Grading { context, .. } => context,
            Self::Storage { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Cancelled { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Capture { .. } => "capture",
            Self::Preprocessing { .. } => "preprocessing",
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::Grading { .. } => "grading",
            Self::Storage { .. } => "storage",
            Self::Io { .. } => "io",
            Self::State { .. } => "state",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

impl fmt::Display for GradeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            GradeError::Capture {
                source_name,
                reason,
                ..
            } => {
                write!(f, "Photo capture from {} failed: {}", source_name, reason)
            }
            GradeError::Preprocessing {
                operation, reason, ..
            } => {
                write!(f, "Image preprocessing failed during {}: {}", operation, reason)
            }
            GradeError::Network {
                operation,
                address,
                source,
                ..
            } => {
                match address {
                    Some(address) => write!(f, "Network error during {} on {}", operation, address)?,
                    None => write!(f, "Network error during {}", operation)?,
                }
                if let Some(source) = source {
                    write!(f, ": {}", source)?;
                }
                Ok(())
            }
            GradeError::Timeout {
                operation,
                duration_ms,
                ..
            } => {
                write!(f, "Timeout during {} after {}ms", operation, duration_ms)
            }
            GradeError::Grading { reason, .. } => {
                write!(f, "Grading failed: {}", reason)
            }
            GradeError::Storage {
                operation, source, ..
            } => {
                write!(f, "Upload history error during {}: {}", operation, source)
            }
            GradeError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            GradeError::State {
                current_state,
                attempted_operation,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Invalid state transition from '{}' when attempting '{}': {}",
                    current_state, attempted_operation, reason
                )
            }
            GradeError::Cancelled { stage, .. } => {
                write!(f, "Capture cancelled during {}", stage)
            }
        }
    }
}

impl StdError for GradeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Storage { source, .. } => Some(source),
            Self::Preprocessing {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            Self::Network {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type GradeResult<T> = Result<T, GradeError>;

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for GradeError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for GradeError {
    fn recovery_suggestion(&self) -> Option<&str> {
        if let Some(suggestion) = self.context().recovery_suggestion.as_deref() {
            return Some(suggestion);
        }
        match self {
            Self::Capture { .. } => Some("Check the photo path and permissions, then capture again"),
            Self::Preprocessing { .. } => Some("Retake the photo; the file looks corrupt or unsupported"),
            Self::Network { .. } | Self::Timeout { .. } => {
                Some("Check your connection and try grading again")
            }
            Self::Grading { .. } => Some("Try again with a sharper, well-lit photo of the card"),
            _ => None,
        }
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Short message suitable for a toast or status line
    pub fn user_message(error: &GradeError) -> String {
        match error {
            GradeError::Capture { .. } => "Photo capture failed".to_string(),
            GradeError::Preprocessing { .. } => "Could not read the photo".to_string(),
            GradeError::Network { .. } => "Could not reach the grading service".to_string(),
            GradeError::Timeout { .. } => "The grading service took too long to answer".to_string(),
            GradeError::Grading { .. } => "No valid response".to_string(),
            GradeError::Storage { .. } | GradeError::Io { .. } => {
                "Could not save the grading result".to_string()
            }
            GradeError::Config { .. } => "Grading is not configured".to_string(),
            GradeError::State { .. } => "A grading is already in progress".to_string(),
            GradeError::Cancelled { .. } => "Capture cancelled".to_string(),
        }
    }
}

/// Error conversion implementations
impl From<std::io::Error> for GradeError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<rusqlite::Error> for GradeError {
    fn from(error: rusqlite::Error) -> Self {
        Self::storage("query", error)
    }
}

impl From<image::ImageError> for GradeError {
    fn from(error: image::ImageError) -> Self {
        Self::preprocessing_from("decode", error)
    }
}

impl From<grade_scale::cpu::ScaleError> for GradeError {
    fn from(error: grade_scale::cpu::ScaleError) -> Self {
        Self::preprocessing_from("resize", error)
    }
}

impl From<reqwest::Error> for GradeError {
    fn from(error: reqwest::Error) -> Self {
        let address = error.url().map(|u| u.to_string());
        let err = Self::network("grading request").with_source(error);
        match address {
            Some(address) => err.with_address(address),
            None => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = GradeError::config("api_key", "<unset>", "no credential configured");
        assert_eq!(error.category(), "config");
        assert_eq!(error.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_error_with_context() {
        let error = GradeError::preprocessing("decode", "truncated JPEG")
            .with_context("decoding IMG_1.jpg")
            .with_operation("preprocess")
            .with_recovery_suggestion("retake the photo");

        assert_eq!(error.context().context.as_deref(), Some("decoding IMG_1.jpg"));
        assert_eq!(error.context().operation.as_deref(), Some("preprocess"));
        assert_eq!(error.recovery_suggestion(), Some("retake the photo"));
    }

    #[test]
    fn test_default_recovery_suggestions() {
        assert!(GradeError::network("connect").recovery_suggestion().is_some());
        assert!(GradeError::state("Calling", "run_once", "busy").recovery_suggestion().is_none());
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            classify::user_message(&GradeError::timeout("grading request", 60_000)),
            "The grading service took too long to answer"
        );
        assert_eq!(
            classify::user_message(&GradeError::grading("missing choices")),
            "No valid response"
        );
    }

    #[test]
    fn test_network_display_includes_address_and_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = GradeError::network("grading request")
            .with_address("https://api.example.test/v1/chat/completions")
            .with_source(cause);
        let text = error.to_string();
        assert!(text.contains("api.example.test"));
        assert!(text.ends_with(": refused"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_io_with_path() {
        let error = GradeError::io(
            "read photo",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        )
        .with_path("/tmp/card.jpg");
        assert!(error.to_string().contains("'/tmp/card.jpg'"));
    }
}
