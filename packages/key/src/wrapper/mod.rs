//! Wrapped primitives: one logical primitive dispatching over every enabled key
//!
//! Producing operations always use the primary key and prepend its output
//! prefix. Consuming operations follow [`PrimitiveBundle::consume`] and
//! collapse every failure into a single generic error.

mod aead;
mod mac;
mod signature;

pub use aead::WrappedAead;
pub use mac::WrappedMac;
pub use signature::{WrappedSigner, WrappedVerifier};

use crate::bundle::PrimitiveBundle;
use crate::keyset::Keyset;
use crate::primitives::PrimitiveKind;
use crate::registry::KeyRegistry;
use crate::{KeysetError, Result};
use tessera_common::LoggingTransformer;

/// A primitive that can be built over a whole keyset
pub trait WrappedPrimitive: Sized {
    /// Capability requested from each key handler
    const KIND: PrimitiveKind;

    /// Build over the enabled entries of `keyset`
    ///
    /// # Errors
    ///
    /// Returns the first entry's instantiation error.
    fn from_keyset(keyset: &Keyset, registry: &KeyRegistry) -> Result<Self>;
}

pub(crate) fn primary_key_id<P: ?Sized>(bundle: &PrimitiveBundle<P>) -> Option<u32> {
    bundle.primary().ok().map(|entry| entry.key_id)
}

/// Report backend failures of a producing operation; other errors pass through unlogged
pub(crate) fn log_backend_failure(operation: &str, err: KeysetError) -> KeysetError {
    if err.is_backend() {
        LoggingTransformer::log_crypto_error(operation, &err);
    }
    err
}
