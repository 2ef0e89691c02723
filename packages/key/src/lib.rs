//! # Tessera Keysets
//!
//! Keyset model, key registry and output-prefix dispatch for rotating
//! cryptographic keys.
//!
//! ## Features
//!
//! - **Key Registry**: pluggable key handlers bound to stable type URLs
//! - **Keysets**: many key versions with unique ids, one primary, and an
//!   enabled/disabled/destroyed lifecycle; mutations are copy-on-write
//! - **Wrapped Primitives**: one `Aead`, `Mac`, `Signer` or `Verifier` over a
//!   whole keyset, framing outputs with TINK/LEGACY/CRUNCHY/RAW prefixes
//! - **Keyset Codec**: binary and JSON serialization, optionally encrypted
//!   under a KMS-held master key
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tessera_key::prelude::*;
//!
//! let handle = KeysetHandle::generate_new(&tessera_cipher::aes256_gcm())?;
//! let aead: WrappedAead = handle.primitive()?;
//! let ciphertext = aead.encrypt(b"hello", b"context")?;
//!
//! let next = handle.add_new_key(&tessera_cipher::aes256_gcm())?;
//! handle.set_primary(next)?;
//! let rotated: WrappedAead = handle.primitive()?;
//! assert_eq!(rotated.decrypt(&ciphertext, b"context")?, b"hello");
//! # Ok::<(), tessera_key::KeysetError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod access;
pub mod bundle;
pub mod codec;
pub mod encoding;
pub mod error;
pub mod handle;
pub mod key_data;
pub mod keyset;
pub mod kms;
pub mod output_prefix;
pub mod primitives;
pub mod registry;
pub mod wrapper;

#[cfg(test)]
mod testing;

/// Common prefix of every type URL defined by the tessera crates
pub const TYPE_URL_PREFIX: &str = "type.tessera.dev/";

pub use access::SecretKeyAccess;
pub use bundle::{BundleEntry, PrimitiveBundle};
pub use codec::{KeysetCodec, KeysetFormat};
pub use error::{BoxError, KeysetError, Result};
pub use handle::KeysetHandle;
pub use key_data::{KeyData, KeyMaterialKind, KeyTemplate};
pub use keyset::{KeyEntry, KeyInfo, KeyStatus, Keyset, KeysetInfo};
pub use kms::{
    Credentials, KMS_ENVELOPE_AEAD_TYPE_URL, KmsClient, KmsClients, KmsEnvelopeAead,
    KmsEnvelopeKeyHandler, LOCAL_KMS_PREFIX, LocalKmsClient, MasterKey, kms_envelope_aead_template,
};
pub use output_prefix::{OutputPrefix, OutputPrefixKind};
pub use primitives::{Aead, Mac, Primitive, PrimitiveKind, Signer, Verifier};
pub use registry::{KeyHandler, KeyRegistry};
pub use wrapper::{WrappedAead, WrappedMac, WrappedPrimitive, WrappedSigner, WrappedVerifier};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Aead, KeyHandler, KeyRegistry, KeyStatus, KeyTemplate, KeysetCodec, KeysetError,
        KeysetHandle, Mac, MasterKey, OutputPrefixKind, Result, SecretKeyAccess, Signer, Verifier,
        WrappedAead, WrappedMac, WrappedSigner, WrappedVerifier,
    };
}
