//! Error types for document parsing, keystore loading and configuration.
//!
//! Problems found while verifying an individual signature are not errors:
//! they are recorded on the [`SignatureVerification`](crate::signatures::SignatureVerification)
//! for that field. Only failures that stop a whole document or a whole keystore
//! from being processed surface here.

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading documents, keystores and configuration.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid cross-reference table
    #[error("Invalid cross-reference table")]
    InvalidXref,

    /// Referenced object not found in cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Unexpected end of file
    #[error("End of file reached unexpectedly")]
    UnexpectedEof,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unsupported feature (e.g. encrypted documents)
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Circular reference detected in object graph
    #[error("Circular reference detected: object {0}")]
    CircularReference(crate::object::ObjectRef),

    /// Recursion depth limit exceeded
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),

    /// A named signature field could not be located or its byte range is unusable
    #[error("Signature field '{field}': {reason}")]
    SignatureField {
        /// Fully qualified field name
        field: String,
        /// What is wrong with the field
        reason: String,
    },

    /// Certificate could not be decoded
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Keystore could not be read or has an unsupported format
    #[error("Keystore error: {0}")]
    Keystore(String),

    /// Every credential attempt failed to open a protected keystore entry
    #[error("No credential worked after {attempts} attempt(s)")]
    NoCredentialWorked {
        /// Number of credentials tried
        attempts: usize,
    },

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::SignatureField`] for the given field.
    pub fn field(field: &str, reason: impl Into<String>) -> Self {
        Error::SignatureField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while loading a keystore.
    ///
    /// These are fatal for the keystore and distinct from the
    /// "no eligible alias" outcome, which is an empty list.
    pub fn is_keystore_error(&self) -> bool {
        matches!(self, Error::Keystore(_) | Error::NoCredentialWorked { .. })
    }
}
