//! # Tessera
//!
//! Cryptographic agility through keysets. A keyset holds many versions of a
//! key, one of them primary; the wrapped primitives built from it produce
//! with the primary and accept output from any enabled key, so keys rotate
//! without breaking existing ciphertexts, tags or signatures.
//!
//! ## Features
//!
//! - `aead` - AES-GCM, ChaCha20-Poly1305 and XChaCha20-Poly1305 keys
//! - `mac` - HMAC-SHA2 keys
//! - `signature` - ECDSA P-256 keys
//! - `pqcrypto` - ML-DSA keys
//! - `full` (default) - all of the above
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera::prelude::*;
//!
//! tessera::register_all()?;
//! let handle = KeysetHandle::generate_new(&tessera::aead::aes256_gcm())?;
//! let aead: WrappedAead = handle.primitive()?;
//! let ciphertext = aead.encrypt(b"Hello, World!", b"greeting")?;
//!
//! let master = MasterKey::from_kms(&LocalKmsClient::new().new_key_uri(&tessera::aead::aes256_gcm())?, None)?;
//! let stored = KeysetCodec::binary().serialize_encrypted(&handle, &master, b"my-app")?;
//! let restored = KeysetCodec::binary().parse_encrypted(&stored, &master, b"my-app")?;
//! let aead: WrappedAead = restored.primitive()?;
//! assert_eq!(aead.decrypt(&ciphertext, b"greeting")?, b"Hello, World!");
//! # Ok::<(), tessera::KeysetError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;

pub use config::Config;
pub use tessera_common::LoggingTransformer;
pub use tessera_key::*;

/// AEAD key types and templates
#[cfg(feature = "aead")]
pub mod aead {
    pub use tessera_cipher::*;
}

/// MAC key types and templates
#[cfg(feature = "mac")]
pub mod mac {
    pub use tessera_hashing::*;
}

/// Classical signature key types and templates
#[cfg(feature = "signature")]
pub mod signature {
    pub use tessera_signature::*;
}

/// Post-quantum signature key types and templates
#[cfg(feature = "pqcrypto")]
pub mod pqcrypto {
    pub use tessera_pqcrypto::*;
}

/// Register every compiled-in key family and the local KMS client globally
///
/// # Errors
///
/// Returns `AlreadyRegistered` if a foreign handler owns one of the type URLs.
pub fn register_all() -> Result<()> {
    Config::default().register()
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Config, register_all};
    pub use tessera_key::prelude::*;
    pub use tessera_key::{KeysetInfo, KmsClients, LocalKmsClient};
}
