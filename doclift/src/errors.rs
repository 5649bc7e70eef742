use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Error kinds for doclift operations
///
/// This enum represents all possible error types that can occur while migrating
/// documents between schema generations. Each error kind describes a specific
/// category of failure, enabling precise error handling.
///
/// # Examples
///
/// ```rust,ignore
/// use doclift::errors::{DocliftError, ErrorKind, DocliftResult};
///
/// fn example() -> DocliftResult<()> {
///     Err(DocliftError::new("migration already running", ErrorKind::AlreadyRunning))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Lifecycle Errors - reported synchronously, before any I/O
    /// `migrate()` was invoked a second time on the same instance
    AlreadyRunning,

    // Migration Errors - fatal to the enclosing generation and the whole run
    /// A user-supplied transform failed or the transform chain is malformed
    TransformFailure,
    /// The fully-transformed document does not satisfy the newest schema
    ValidationError,
    /// The newest collection's storage rejected an insert
    WriteFailure,
    /// A generation's undeleted-document count could not be obtained
    CountFailure,

    // Storage Errors - surfaced by storage providers
    /// Error from a storage backend
    BackendError,
    /// The storage handle has already been destroyed
    StoreDestroyed,

    // Registry Errors - surfaced by the generation catalog
    /// Error in the generation registry
    RegistryError,

    // Operation Errors - invalid use of the public API
    /// The operation is not valid in the current context
    InvalidOperation,

    // Generic/Internal Errors - used as fallback
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::AlreadyRunning => write!(f, "Already running"),
            ErrorKind::TransformFailure => write!(f, "Transform failure"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::WriteFailure => write!(f, "Write failure"),
            ErrorKind::CountFailure => write!(f, "Count failure"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::StoreDestroyed => write!(f, "Store destroyed"),
            ErrorKind::RegistryError => write!(f, "Registry error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom doclift error type.
///
/// `DocliftError` encapsulates error information including the error message, kind,
/// and optional cause. It supports error chaining and backtraces for debugging.
///
/// Errors are cheaply cloneable so that memoized operations (such as
/// `migrate_and_wait`) can hand the same outcome to repeated callers.
///
/// # Examples
///
/// ```rust,ignore
/// use doclift::errors::{DocliftError, ErrorKind};
///
/// // Create a simple error
/// let err = DocliftError::new("count failed", ErrorKind::CountFailure);
///
/// // Create an error with a cause
/// let cause = DocliftError::new("backend unavailable", ErrorKind::BackendError);
/// let err = DocliftError::new_with_cause("count failed", ErrorKind::CountFailure, cause);
/// ```
///
/// # Type alias
///
/// The `DocliftResult<T>` type alias is equivalent to `Result<T, DocliftError>` and is
/// used throughout the codebase for operations that can fail.
#[derive(Clone)]
pub struct DocliftError {
    message: String,
    kind: ErrorKind,
    cause: Option<Arc<DocliftError>>,
    backtrace: Arc<Backtrace>,
}

impl DocliftError {
    /// Creates a new error with the given message and kind.
    pub fn new(message: &str, kind: ErrorKind) -> Self {
        DocliftError {
            message: message.to_string(),
            kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new_unresolved()),
        }
    }

    /// Creates a new error with the given message, kind and underlying cause.
    pub fn new_with_cause(message: &str, kind: ErrorKind, cause: DocliftError) -> Self {
        DocliftError {
            message: message.to_string(),
            kind,
            cause: Some(Arc::new(cause)),
            backtrace: Arc::new(Backtrace::new_unresolved()),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the underlying cause, if any.
    pub fn cause(&self) -> Option<&DocliftError> {
        self.cause.as_deref()
    }
}

impl Display for DocliftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (caused by: {})", cause)?;
        }
        Ok(())
    }
}

impl Debug for DocliftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocliftError")
            .field("message", &self.message)
            .field("kind", &self.kind)
            .field("cause", &self.cause)
            .finish()
    }
}

impl Error for DocliftError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_ref().map(|c| c.as_ref() as &(dyn Error + 'static))
    }
}

/// Result type used throughout doclift.
pub type DocliftResult<T> = Result<T, DocliftError>;
