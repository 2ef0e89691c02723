//! # Tessera Cipher
//!
//! AEAD key types for tessera keysets: AES-GCM, ChaCha20-Poly1305 and
//! XChaCha20-Poly1305.
//!
//! Register the handlers once, then generate keysets from the templates:
//!
//! ```rust,ignore
//! tessera_cipher::register()?;
//! let handle = tessera_key::KeysetHandle::generate_new(&tessera_cipher::aes256_gcm())?;
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(any(feature = "aes", feature = "chacha20")))]
compile_error!("tessera_cipher needs at least one of the `aes` or `chacha20` features");

mod handlers;
mod key_format;
mod nonce_framed;

#[cfg(feature = "aes")]
pub use handlers::AesGcmKeyHandler;
#[cfg(feature = "chacha20")]
pub use handlers::{ChaCha20Poly1305KeyHandler, XChaCha20Poly1305KeyHandler};
pub use handlers::{AES_GCM_TYPE_URL, CHACHA20_POLY1305_TYPE_URL, XCHACHA20_POLY1305_TYPE_URL};

use serde_json::json;
use tessera_key::{KeyRegistry, KeyTemplate, OutputPrefixKind, Result};

/// Register every enabled AEAD key handler with the global registry
///
/// # Errors
///
/// Returns `AlreadyRegistered` if another handler owns one of the type URLs.
pub fn register() -> Result<()> {
    register_with(KeyRegistry::global())
}

/// Register every enabled AEAD key handler with `registry`
///
/// # Errors
///
/// Returns `AlreadyRegistered` if another handler owns one of the type URLs.
pub fn register_with(registry: &KeyRegistry) -> Result<()> {
    #[cfg(feature = "aes")]
    registry.register_handler(AesGcmKeyHandler)?;
    #[cfg(feature = "chacha20")]
    {
        registry.register_handler(ChaCha20Poly1305KeyHandler)?;
        registry.register_handler(XChaCha20Poly1305KeyHandler)?;
    }
    tracing::debug!("registered AEAD key handlers");
    Ok(())
}

/// AES-128-GCM, TINK prefix
#[must_use]
pub fn aes128_gcm() -> KeyTemplate {
    KeyTemplate::new(AES_GCM_TYPE_URL, json!({ "key_size": 16 }), OutputPrefixKind::Tink)
}

/// AES-256-GCM, TINK prefix
#[must_use]
pub fn aes256_gcm() -> KeyTemplate {
    KeyTemplate::new(AES_GCM_TYPE_URL, json!({ "key_size": 32 }), OutputPrefixKind::Tink)
}

/// AES-256-GCM without an output prefix
#[must_use]
pub fn aes256_gcm_raw() -> KeyTemplate {
    aes256_gcm().with_output_prefix(OutputPrefixKind::Raw)
}

/// ChaCha20-Poly1305, TINK prefix
#[must_use]
pub fn chacha20_poly1305() -> KeyTemplate {
    KeyTemplate::new(CHACHA20_POLY1305_TYPE_URL, json!({}), OutputPrefixKind::Tink)
}

/// XChaCha20-Poly1305, TINK prefix
#[must_use]
pub fn xchacha20_poly1305() -> KeyTemplate {
    KeyTemplate::new(XCHACHA20_POLY1305_TYPE_URL, json!({}), OutputPrefixKind::Tink)
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        aes128_gcm, aes256_gcm, aes256_gcm_raw, chacha20_poly1305, register, register_with,
        xchacha20_poly1305,
    };
}
