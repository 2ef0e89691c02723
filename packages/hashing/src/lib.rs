//! # Tessera Hashing
//!
//! HMAC-SHA2 key type for tessera keysets.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod hmac_key;

pub use hmac_key::{HMAC_TYPE_URL, HashType, HmacKeyHandler, MIN_KEY_SIZE, MIN_TAG_SIZE};

use serde_json::json;
use tessera_key::{KeyRegistry, KeyTemplate, OutputPrefixKind, Result};

/// Register the HMAC key handler with the global registry
///
/// # Errors
///
/// Returns `AlreadyRegistered` if another handler owns the type URL.
pub fn register() -> Result<()> {
    register_with(KeyRegistry::global())
}

/// Register the HMAC key handler with `registry`
///
/// # Errors
///
/// Returns `AlreadyRegistered` if another handler owns the type URL.
pub fn register_with(registry: &KeyRegistry) -> Result<()> {
    registry.register_handler(HmacKeyHandler)?;
    tracing::debug!("registered HMAC key handler");
    Ok(())
}

fn hmac_template(hash: &str, tag_size: usize, key_size: usize) -> KeyTemplate {
    KeyTemplate::new(
        HMAC_TYPE_URL,
        json!({ "hash": hash, "tag_size": tag_size, "key_size": key_size }),
        OutputPrefixKind::Tink,
    )
}

/// HMAC-SHA256 with a 32-byte key and full 32-byte tags
#[must_use]
pub fn hmac_sha256() -> KeyTemplate {
    hmac_template("SHA256", 32, 32)
}

/// HMAC-SHA256 with a 32-byte key and 16-byte tags
#[must_use]
pub fn hmac_sha256_half_tag() -> KeyTemplate {
    hmac_template("SHA256", 16, 32)
}

/// HMAC-SHA384 with a 48-byte key and 48-byte tags
#[must_use]
pub fn hmac_sha384() -> KeyTemplate {
    hmac_template("SHA384", 48, 48)
}

/// HMAC-SHA512 with a 64-byte key and 64-byte tags
#[must_use]
pub fn hmac_sha512() -> KeyTemplate {
    hmac_template("SHA512", 64, 64)
}

/// HMAC-SHA512 with a 64-byte key and 32-byte tags
#[must_use]
pub fn hmac_sha512_half_tag() -> KeyTemplate {
    hmac_template("SHA512", 32, 64)
}
