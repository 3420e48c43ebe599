//! Error types returned by every fallible operation in the crate.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, TlsCaError>;

/// Represents errors that can occur while encoding identities or issuing certificates.
///
/// Every variant carries a human readable description of the failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TlsCaError {
    /// An identity or request violates an encoding constraint.
    #[error("Invalid identity: {0}")]
    ValidationError(String),

    /// A subject, attribute or certificate could not be interpreted.
    #[error("Failed to decode data: {0}")]
    DecodeError(String),

    /// Key or certificate material is malformed, unsupported or mismatched.
    #[error("Invalid key material: {0}")]
    KeyFormatError(String),

    /// The authority could not produce a certificate.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// Our own output could not be serialized.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),
}

impl From<der::Error> for TlsCaError {
    /// Converts a `der::Error` into a `TlsCaError`.
    fn from(err: der::Error) -> Self {
        TlsCaError::DecodeError(err.to_string())
    }
}

impl From<pem::PemError> for TlsCaError {
    fn from(err: pem::PemError) -> Self {
        TlsCaError::DecodeError(err.to_string())
    }
}

impl TlsCaError {
    /// Re-labels any error as a key material problem.
    ///
    /// Authority constructors use this so that a bad certificate or key
    /// always surfaces as [`TlsCaError::KeyFormatError`].
    pub(crate) fn into_key_format(self) -> Self {
        match self {
            TlsCaError::KeyFormatError(msg) => TlsCaError::KeyFormatError(msg),
            TlsCaError::ValidationError(msg)
            | TlsCaError::DecodeError(msg)
            | TlsCaError::SigningError(msg)
            | TlsCaError::EncodingError(msg) => TlsCaError::KeyFormatError(msg),
        }
    }
}
