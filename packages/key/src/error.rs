//! Comprehensive error handling for keyset operations

use crate::primitives::PrimitiveKind;
use thiserror::Error;

/// Boxed error produced by a cryptographic backend or KMS client
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Keyset-specific errors
#[derive(Debug, Error)]
pub enum KeysetError {
    /// No key handler is registered for the type URL
    #[error("Unknown key type: {0}")]
    UnknownKeyType(String),

    /// A different key handler is already bound to the type URL
    #[error("Key handler already registered for type: {0}")]
    AlreadyRegistered(String),

    /// The key handler cannot produce the requested primitive
    #[error("Key type {type_url} does not support primitive {primitive}")]
    UnsupportedPrimitive {
        /// Type URL of the key
        type_url: String,
        /// Requested primitive capability
        primitive: PrimitiveKind,
    },

    /// Malformed or invalid individual key material or parameters
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Cross-entry keyset invariant violation
    #[error("Invalid keyset: {0}")]
    InvalidKeyset(String),

    /// A producing operation was requested but the keyset has no primary key
    #[error("Keyset has no primary key")]
    NoPrimaryKey,

    /// Secret key material was encountered where none is allowed
    #[error("Keyset contains secret key material")]
    SecretKeyAccessDenied,

    /// Signature or MAC verification failed
    #[error("Verification failed")]
    VerificationFailed,

    /// Decryption failed
    #[error("Decryption failed")]
    DecryptionFailed,

    /// No registered KMS client supports the key URI
    #[error("No KMS client supports key URI: {0}")]
    UnsupportedKeyUri(String),

    /// Keyset or key material could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failure reported by a cryptographic backend or KMS client
    #[error("Backend failure: {source}")]
    Backend {
        /// The underlying error, unmodified
        #[source]
        source: BoxError,
        /// Whether retrying the operation may succeed
        transient: bool,
    },
}

impl KeysetError {
    /// Create an `InvalidKey` error
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Create an `InvalidKeyset` error
    pub fn invalid_keyset(msg: impl Into<String>) -> Self {
        Self::InvalidKeyset(msg.into())
    }

    /// Create a `Serialization` error
    pub fn serialization(msg: impl std::fmt::Display) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Wrap a permanent backend failure
    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend {
            source: err.into(),
            transient: false,
        }
    }

    /// Wrap a backend failure that the caller may retry
    pub fn transient(err: impl Into<BoxError>) -> Self {
        Self::Backend {
            source: err.into(),
            transient: true,
        }
    }

    /// True for backend failures flagged as retryable
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend { transient: true, .. })
    }

    /// True for any failure originating in a backend or KMS client
    #[must_use]
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }

    /// Keep retryable backend failures, collapse everything else to `DecryptionFailed`
    #[must_use]
    pub fn into_decryption_failure(self) -> Self {
        if self.is_transient() {
            self
        } else {
            Self::DecryptionFailed
        }
    }
}

/// Result type for keyset operations
pub type Result<T> = std::result::Result<T, KeysetError>;
