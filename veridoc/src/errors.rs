use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

use crate::schema::ValidationError;

/// Error kinds for Veridoc operations.
///
/// Each kind describes a category of failure, enabling precise error handling
/// at call sites without string matching.
///
/// # Examples
///
/// ```rust,ignore
/// use veridoc::errors::{VeridocError, ErrorKind, VeridocResult};
///
/// fn example() -> VeridocResult<()> {
///     Err(VeridocError::new("not connected to the document store", ErrorKind::NotConnected))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// An operation was attempted without a live store connection
    NotConnected,
    /// A document failed its collection's schema check; carries the
    /// offending field's dotted path and the reason
    Validation(ValidationError),
    /// A transient failure while establishing or probing a connection
    Connectivity,
    /// Invalid configuration (duplicate schema registration, bad builder input)
    Configuration,
    /// The operation is not valid in the current context
    InvalidOperation,
    /// A bulk migration could not process a document
    Migration,
    /// Error reported by the underlying store
    Backend,
    /// Generic IO error
    IOError,
    /// Error encoding or decoding data
    Encoding,
    /// Internal error (usually indicates a bug)
    Internal,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotConnected => write!(f, "Not connected"),
            ErrorKind::Validation(err) => write!(f, "Validation error: {}", err),
            ErrorKind::Connectivity => write!(f, "Connectivity error"),
            ErrorKind::Configuration => write!(f, "Configuration error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::Migration => write!(f, "Migration error"),
            ErrorKind::Backend => write!(f, "Backend error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::Encoding => write!(f, "Encoding error"),
            ErrorKind::Internal => write!(f, "Internal error"),
        }
    }
}

/// Custom Veridoc error type.
///
/// `VeridocError` encapsulates the error message, kind, and an optional cause.
/// It supports error chaining and carries a backtrace captured at creation
/// for debugging.
///
/// # Examples
///
/// ```rust,ignore
/// use veridoc::errors::{VeridocError, ErrorKind};
///
/// // Create a simple error
/// let err = VeridocError::new("store is closed", ErrorKind::Backend);
///
/// // Create an error with a cause
/// let cause = VeridocError::new("disk full", ErrorKind::IOError);
/// let err = VeridocError::new_with_cause("backup failed", ErrorKind::Backend, cause);
/// ```
#[derive(Clone)]
pub struct VeridocError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<VeridocError>>,
    backtrace: Arc<Backtrace>,
}

impl VeridocError {
    /// Creates a new `VeridocError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        VeridocError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `VeridocError` with a cause error, preserving the chain
    /// for debugging.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: VeridocError) -> Self {
        VeridocError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&VeridocError> {
        self.cause.as_deref()
    }

    /// Returns the validation failure carried by this error, if any.
    pub fn validation(&self) -> Option<&ValidationError> {
        match &self.error_kind {
            ErrorKind::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for VeridocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for VeridocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace),
        }
    }
}

impl Error for VeridocError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for Veridoc operations.
///
/// `VeridocResult<T>` is shorthand for `Result<T, VeridocError>`.
/// All fallible Veridoc operations return this type.
pub type VeridocResult<T> = Result<T, VeridocError>;

// From trait implementations for automatic error conversion
impl From<std::io::Error> for VeridocError {
    fn from(err: std::io::Error) -> Self {
        VeridocError::new(&format!("IO error: {}", err), ErrorKind::IOError)
    }
}

impl From<serde_json::Error> for VeridocError {
    fn from(err: serde_json::Error) -> Self {
        VeridocError::new(
            &format!("JSON serialization error: {}", err),
            ErrorKind::Encoding,
        )
    }
}

impl From<ValidationError> for VeridocError {
    fn from(err: ValidationError) -> Self {
        VeridocError::new(&err.to_string(), ErrorKind::Validation(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, ValidationError};

    #[test]
    fn veridoc_error_new_creates_error() {
        let error = VeridocError::new("an error occurred", ErrorKind::Backend);
        assert_eq!(error.message(), "an error occurred");
        assert_eq!(error.kind(), &ErrorKind::Backend);
        assert!(error.cause().is_none());
    }

    #[test]
    fn veridoc_error_new_with_cause_creates_error() {
        let cause = VeridocError::new("disk full", ErrorKind::IOError);
        let error = VeridocError::new_with_cause("backup failed", ErrorKind::Backend, cause);
        assert_eq!(error.message(), "backup failed");
        assert_eq!(error.kind(), &ErrorKind::Backend);
        assert!(error.cause().is_some());
        assert_eq!(error.cause().unwrap().kind(), &ErrorKind::IOError);
    }

    #[test]
    fn veridoc_error_display_formats_correctly() {
        let error = VeridocError::new("an error occurred", ErrorKind::IOError);
        assert_eq!(format!("{}", error), "an error occurred");
    }

    #[test]
    fn veridoc_error_debug_formats_with_cause() {
        let cause = VeridocError::new("disk full", ErrorKind::IOError);
        let error = VeridocError::new_with_cause("backup failed", ErrorKind::Backend, cause);
        let formatted = format!("{:?}", error);
        assert!(formatted.contains("backup failed"));
        assert!(formatted.contains("Caused by:"));
    }

    #[test]
    fn veridoc_error_source_returns_cause() {
        let cause = VeridocError::new("disk full", ErrorKind::IOError);
        let error = VeridocError::new_with_cause("backup failed", ErrorKind::Backend, cause);
        assert!(error.source().is_some());

        let error = VeridocError::new("no cause", ErrorKind::Internal);
        assert!(error.source().is_none());
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(format!("{}", ErrorKind::NotConnected), "Not connected");
        assert_eq!(format!("{}", ErrorKind::Connectivity), "Connectivity error");
        assert_eq!(format!("{}", ErrorKind::Migration), "Migration error");
        assert_eq!(format!("{}", ErrorKind::Backend), "Backend error");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: VeridocError = io_err.into();
        assert_eq!(error.kind(), &ErrorKind::IOError);
        assert!(error.message().contains("IO error"));
    }

    #[test]
    fn test_from_validation_error() {
        let validation = ValidationError::type_mismatch("semestre", FieldType::Int, "string");
        let error: VeridocError = validation.clone().into();
        assert_eq!(error.kind(), &ErrorKind::Validation(validation.clone()));
        assert_eq!(error.validation(), Some(&validation));
        assert!(error.message().contains("semestre"));
    }

    #[test]
    fn test_question_mark_operator_with_from() {
        fn failing_io() -> VeridocResult<()> {
            let _ = std::fs::File::open("/definitely/not/a/real/path/9e41")?;
            Ok(())
        }

        let result = failing_io();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::IOError);
    }

    #[test]
    fn test_error_kind_equality() {
        let error1 = VeridocError::new("one", ErrorKind::NotConnected);
        let error2 = VeridocError::new("two", ErrorKind::NotConnected);
        let error3 = VeridocError::new("three", ErrorKind::Backend);

        assert_eq!(error1.kind(), error2.kind());
        assert_ne!(error1.kind(), error3.kind());
    }

    #[test]
    fn test_error_chain_with_different_kinds() {
        let root = VeridocError::new("connection refused", ErrorKind::Connectivity);
        let mid = VeridocError::new_with_cause("probe failed", ErrorKind::Backend, root);
        let top = VeridocError::new_with_cause("migration aborted", ErrorKind::Migration, mid);

        assert_eq!(top.kind(), &ErrorKind::Migration);
        assert_eq!(top.cause().unwrap().kind(), &ErrorKind::Backend);
        assert_eq!(
            top.cause().unwrap().cause().unwrap().kind(),
            &ErrorKind::Connectivity
        );
    }
}
