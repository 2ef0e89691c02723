//! # Tessera Post-Quantum
//!
//! ML-DSA signature key types for tessera keysets. They plug into the same
//! registry, prefixes and rotation as the classical signature keys, so a
//! keyset can migrate from ECDSA to ML-DSA by rotating its primary.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod ml_dsa;

pub use ml_dsa::{
    ML_DSA_44_PRIVATE_TYPE_URL, ML_DSA_44_PUBLIC_TYPE_URL, ML_DSA_65_PRIVATE_TYPE_URL,
    ML_DSA_65_PUBLIC_TYPE_URL, ML_DSA_87_PRIVATE_TYPE_URL, ML_DSA_87_PUBLIC_TYPE_URL,
    MlDsa44PrivateKeyHandler, MlDsa44PublicKeyHandler, MlDsa65PrivateKeyHandler,
    MlDsa65PublicKeyHandler, MlDsa87PrivateKeyHandler, MlDsa87PublicKeyHandler,
};

use tessera_key::{KeyRegistry, KeyTemplate, OutputPrefixKind, Result};

/// Register every ML-DSA key handler with the global registry
///
/// # Errors
///
/// Returns `AlreadyRegistered` if another handler owns one of the type URLs.
pub fn register() -> Result<()> {
    register_with(KeyRegistry::global())
}

/// Register every ML-DSA key handler with `registry`
///
/// # Errors
///
/// Returns `AlreadyRegistered` if another handler owns one of the type URLs.
pub fn register_with(registry: &KeyRegistry) -> Result<()> {
    registry.register_handler(MlDsa44PrivateKeyHandler)?;
    registry.register_handler(MlDsa44PublicKeyHandler)?;
    registry.register_handler(MlDsa65PrivateKeyHandler)?;
    registry.register_handler(MlDsa65PublicKeyHandler)?;
    registry.register_handler(MlDsa87PrivateKeyHandler)?;
    registry.register_handler(MlDsa87PublicKeyHandler)?;
    tracing::debug!("registered ML-DSA key handlers");
    Ok(())
}

fn template(type_url: &str) -> KeyTemplate {
    KeyTemplate::new(type_url, serde_json::json!({}), OutputPrefixKind::Tink)
}

/// ML-DSA-44 (NIST level 2), TINK prefix
#[must_use]
pub fn ml_dsa_44() -> KeyTemplate {
    template(ML_DSA_44_PRIVATE_TYPE_URL)
}

/// ML-DSA-65 (NIST level 3), TINK prefix
#[must_use]
pub fn ml_dsa_65() -> KeyTemplate {
    template(ML_DSA_65_PRIVATE_TYPE_URL)
}

/// ML-DSA-87 (NIST level 5), TINK prefix
#[must_use]
pub fn ml_dsa_87() -> KeyTemplate {
    template(ML_DSA_87_PRIVATE_TYPE_URL)
}
