//! Store error taxonomy
//!
//! Every fallible store operation returns exactly one of these kinds:
//! - STORE_UNKNOWN (uncategorized internal failure)
//! - STORE_OBJECT_ALREADY_DELETED (key existed, record since removed)
//! - STORE_OBJECT_NOT_FOUND (key or resource never existed)
//! - STORE_BAD_REQUEST (malformed input, key collisions, invalid references)
//!
//! Errors carry a (domain, code, message) triple so the serving layer can map
//! them to protocol status codes without string matching.

use std::fmt;

/// Error domain for all store errors.
pub const STORE_ERROR_DOMAIN: &str = "mockstore.store";

/// The closed set of store error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Uncategorized internal failure
    Unknown,
    /// Operation targeted a key that previously existed but was deleted
    ObjectAlreadyDeleted,
    /// Operation targeted a key or resource that does not exist
    ObjectNotFound,
    /// Input malformed: bad key types, key collisions, invalid references
    BadRequest,
}

impl StoreErrorKind {
    /// Returns the stable string code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorKind::Unknown => "STORE_UNKNOWN",
            StoreErrorKind::ObjectAlreadyDeleted => "STORE_OBJECT_ALREADY_DELETED",
            StoreErrorKind::ObjectNotFound => "STORE_OBJECT_NOT_FOUND",
            StoreErrorKind::BadRequest => "STORE_BAD_REQUEST",
        }
    }

    /// Returns the stable numeric code for this kind
    pub fn numeric_code(&self) -> u32 {
        match self {
            StoreErrorKind::Unknown => 0,
            StoreErrorKind::ObjectAlreadyDeleted => 1,
            StoreErrorKind::ObjectNotFound => 2,
            StoreErrorKind::BadRequest => 3,
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Boxed error source attached for diagnostics.
type Source = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Store error with full context.
#[derive(Debug)]
pub struct StoreError {
    /// Error kind
    kind: StoreErrorKind,
    /// Human-readable message
    message: String,
    /// Underlying cause if applicable
    source: Option<Source>,
}

impl StoreError {
    /// Create an unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Unknown,
            message: message.into(),
            source: None,
        }
    }

    /// Create an unknown error with an underlying cause
    pub fn unknown_with_source(message: impl Into<String>, source: impl Into<Source>) -> Self {
        Self {
            kind: StoreErrorKind::Unknown,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an already-deleted error
    pub fn already_deleted(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::ObjectAlreadyDeleted,
            message: message.into(),
            source: None,
        }
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::ObjectNotFound,
            message: message.into(),
            source: None,
        }
    }

    /// Create a bad-request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::BadRequest,
            message: message.into(),
            source: None,
        }
    }

    /// Create a bad-request error with an underlying cause
    pub fn bad_request_with_source(message: impl Into<String>, source: impl Into<Source>) -> Self {
        Self {
            kind: StoreErrorKind::BadRequest,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error kind
    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    /// Returns the error domain
    pub fn domain(&self) -> &'static str {
        STORE_ERROR_DOMAIN
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {}] {}",
            STORE_ERROR_DOMAIN,
            self.kind.code(),
            self.message
        )
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
