//! Primitive capability traits implemented by backends and wrapped primitives

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Authenticated encryption with associated data
pub trait Aead: Send + Sync {
    /// Encrypt `plaintext`, binding `associated_data` into the authentication tag
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt `ciphertext`; fails with `DecryptionFailed` on any mismatch
    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>>;
}

/// Message authentication code
pub trait Mac: Send + Sync {
    /// Compute a tag over `data`
    fn compute_mac(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Verify `tag` over `data`; fails with `VerificationFailed` on mismatch
    fn verify_mac(&self, tag: &[u8], data: &[u8]) -> Result<()>;
}

/// Digital signature creation
pub trait Signer: Send + Sync {
    /// Sign `data`
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Digital signature verification
pub trait Verifier: Send + Sync {
    /// Verify `signature` over `data`; fails with `VerificationFailed` on mismatch
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()>;
}

/// Primitive capabilities a key handler may offer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    /// [`Aead`]
    Aead,
    /// [`Mac`]
    Mac,
    /// [`Signer`]
    Signer,
    /// [`Verifier`]
    Verifier,
}

impl PrimitiveKind {
    /// Human-readable capability name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Aead => "Aead",
            Self::Mac => "Mac",
            Self::Signer => "Signer",
            Self::Verifier => "Verifier",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An instantiated primitive returned by a key handler
#[derive(Clone)]
pub enum Primitive {
    /// Authenticated encryption
    Aead(Arc<dyn Aead>),
    /// Message authentication
    Mac(Arc<dyn Mac>),
    /// Signature creation
    Signer(Arc<dyn Signer>),
    /// Signature verification
    Verifier(Arc<dyn Verifier>),
}

impl Primitive {
    /// Capability carried by this primitive
    #[must_use]
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Aead(_) => PrimitiveKind::Aead,
            Self::Mac(_) => PrimitiveKind::Mac,
            Self::Signer(_) => PrimitiveKind::Signer,
            Self::Verifier(_) => PrimitiveKind::Verifier,
        }
    }

    /// The [`Aead`], if this is one
    #[must_use]
    pub fn into_aead(self) -> Option<Arc<dyn Aead>> {
        match self {
            Self::Aead(p) => Some(p),
            _ => None,
        }
    }

    /// The [`Mac`], if this is one
    #[must_use]
    pub fn into_mac(self) -> Option<Arc<dyn Mac>> {
        match self {
            Self::Mac(p) => Some(p),
            _ => None,
        }
    }

    /// The [`Signer`], if this is one
    #[must_use]
    pub fn into_signer(self) -> Option<Arc<dyn Signer>> {
        match self {
            Self::Signer(p) => Some(p),
            _ => None,
        }
    }

    /// The [`Verifier`], if this is one
    #[must_use]
    pub fn into_verifier(self) -> Option<Arc<dyn Verifier>> {
        match self {
            Self::Verifier(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Primitive({})", self.kind())
    }
}
