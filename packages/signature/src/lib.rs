//! # Tessera Signature
//!
//! ECDSA P-256 key types for tessera keysets. Private keys produce signers;
//! their public halves, obtained through
//! [`tessera_key::KeysetHandle::public_keyset_handle`], produce verifiers.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod ecdsa;

pub use ecdsa::{
    ECDSA_PRIVATE_TYPE_URL, ECDSA_PUBLIC_TYPE_URL, EcdsaPrivateKeyHandler, EcdsaPublicKeyHandler,
    SignatureEncoding,
};

use serde_json::json;
use tessera_key::{KeyRegistry, KeyTemplate, OutputPrefixKind, Result};

/// Register both ECDSA key handlers with the global registry
///
/// # Errors
///
/// Returns `AlreadyRegistered` if another handler owns one of the type URLs.
pub fn register() -> Result<()> {
    register_with(KeyRegistry::global())
}

/// Register both ECDSA key handlers with `registry`
///
/// # Errors
///
/// Returns `AlreadyRegistered` if another handler owns one of the type URLs.
pub fn register_with(registry: &KeyRegistry) -> Result<()> {
    registry.register_handler(EcdsaPrivateKeyHandler)?;
    registry.register_handler(EcdsaPublicKeyHandler)?;
    tracing::debug!("registered ECDSA key handlers");
    Ok(())
}

/// ECDSA P-256 with DER signatures, TINK prefix
#[must_use]
pub fn ecdsa_p256() -> KeyTemplate {
    KeyTemplate::new(
        ECDSA_PRIVATE_TYPE_URL,
        json!({ "encoding": "DER" }),
        OutputPrefixKind::Tink,
    )
}

/// ECDSA P-256 with 64-byte `r || s` signatures, TINK prefix
#[must_use]
pub fn ecdsa_p256_ieee_p1363() -> KeyTemplate {
    KeyTemplate::new(
        ECDSA_PRIVATE_TYPE_URL,
        json!({ "encoding": "IEEE_P1363" }),
        OutputPrefixKind::Tink,
    )
}

/// ECDSA P-256 with 64-byte signatures and no output prefix
#[must_use]
pub fn ecdsa_p256_raw() -> KeyTemplate {
    ecdsa_p256_ieee_p1363().with_output_prefix(OutputPrefixKind::Raw)
}
