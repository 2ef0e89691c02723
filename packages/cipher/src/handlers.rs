//! Key handlers for the AEAD key types

use crate::key_format::AeadKey;
use crate::nonce_framed::NonceFramed;
use rand::RngCore;
use serde::Deserialize;
use std::sync::Arc;
use tessera_key::{
    KeyHandler, KeyMaterialKind, KeysetError, Primitive, PrimitiveKind, Result,
};
use zeroize::Zeroizing;

/// Type URL of AES-GCM keys
pub const AES_GCM_TYPE_URL: &str = "type.tessera.dev/tessera.AesGcmKey";
/// Type URL of ChaCha20-Poly1305 keys
pub const CHACHA20_POLY1305_TYPE_URL: &str = "type.tessera.dev/tessera.ChaCha20Poly1305Key";
/// Type URL of XChaCha20-Poly1305 keys
pub const XCHACHA20_POLY1305_TYPE_URL: &str = "type.tessera.dev/tessera.XChaCha20Poly1305Key";

const AEAD_ONLY: &[PrimitiveKind] = &[PrimitiveKind::Aead];

/// Template parameters shared by the AEAD key types
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AeadParams {
    key_size: Option<usize>,
}

fn parse_params(params: &serde_json::Value) -> Result<AeadParams> {
    if params.is_null() {
        return Ok(AeadParams::default());
    }
    AeadParams::deserialize(params)
        .map_err(|e| KeysetError::invalid_key(format!("invalid AEAD parameters: {e}")))
}

fn random_key(len: usize) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(vec![0u8; len]);
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

/// Fixed-size key types: one allowed key length, no required parameters
#[cfg(feature = "chacha20")]
macro_rules! fixed_size_aead_handler {
    ($(#[$doc:meta])* $name:ident, $url:expr, $key_len:literal, $cipher:ty, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl KeyHandler for $name {
            fn type_url(&self) -> &str {
                $url
            }

            fn material_kind(&self) -> KeyMaterialKind {
                KeyMaterialKind::Symmetric
            }

            fn supported_primitives(&self) -> &[PrimitiveKind] {
                AEAD_ONLY
            }

            fn validate_params(&self, params: &serde_json::Value) -> Result<()> {
                match parse_params(params)?.key_size {
                    None => Ok(()),
                    Some(size) if size == $key_len => Ok(()),
                    Some(other) => Err(KeysetError::invalid_key(format!(
                        "{} requires a {}-byte key, not {other}",
                        $label, $key_len
                    ))),
                }
            }

            fn validate_key(&self, key: &[u8]) -> Result<()> {
                AeadKey::decode(key, &[$key_len]).map(drop)
            }

            fn generate(&self, params: &serde_json::Value) -> Result<Vec<u8>> {
                self.validate_params(params)?;
                AeadKey::new(random_key($key_len).to_vec()).encode()
            }

            fn primitive(&self, kind: PrimitiveKind, key: &[u8]) -> Result<Primitive> {
                if kind != PrimitiveKind::Aead {
                    return Err(KeysetError::UnsupportedPrimitive {
                        type_url: $url.to_string(),
                        primitive: kind,
                    });
                }
                let key = AeadKey::decode(key, &[$key_len])?;
                let cipher = <$cipher as chacha20poly1305::KeyInit>::new_from_slice(&key.key_value)
                    .map_err(|_| KeysetError::invalid_key(concat!($label, " key has the wrong length")))?;
                Ok(Primitive::Aead(Arc::new(NonceFramed::new(cipher, $label))))
            }
        }
    };
}

/// AES-GCM with 128- or 256-bit keys, 12-byte random nonces and 16-byte tags
///
/// Template parameters: `{"key_size": 16}` or `{"key_size": 32}`.
#[cfg(feature = "aes")]
#[derive(Debug, Default, Clone, Copy)]
pub struct AesGcmKeyHandler;

#[cfg(feature = "aes")]
impl AesGcmKeyHandler {
    const KEY_SIZES: &'static [usize] = &[16, 32];

    fn cipher(key: &AeadKey) -> Result<Arc<dyn tessera_key::Aead>> {
        use aes_gcm::KeyInit;
        let bad_len = |_| KeysetError::invalid_key("AES-GCM key has the wrong length");
        Ok(match key.key_value.len() {
            16 => Arc::new(NonceFramed::new(
                aes_gcm::Aes128Gcm::new_from_slice(&key.key_value).map_err(bad_len)?,
                "AES-128-GCM",
            )),
            _ => Arc::new(NonceFramed::new(
                aes_gcm::Aes256Gcm::new_from_slice(&key.key_value).map_err(bad_len)?,
                "AES-256-GCM",
            )),
        })
    }
}

#[cfg(feature = "aes")]
impl KeyHandler for AesGcmKeyHandler {
    fn type_url(&self) -> &str {
        AES_GCM_TYPE_URL
    }

    fn material_kind(&self) -> KeyMaterialKind {
        KeyMaterialKind::Symmetric
    }

    fn supported_primitives(&self) -> &[PrimitiveKind] {
        AEAD_ONLY
    }

    fn validate_params(&self, params: &serde_json::Value) -> Result<()> {
        match parse_params(params)?.key_size {
            Some(size) if Self::KEY_SIZES.contains(&size) => Ok(()),
            Some(size) => Err(KeysetError::invalid_key(format!(
                "AES-GCM key size must be 16 or 32 bytes, not {size}"
            ))),
            None => Err(KeysetError::invalid_key("AES-GCM requires key_size")),
        }
    }

    fn validate_key(&self, key: &[u8]) -> Result<()> {
        AeadKey::decode(key, Self::KEY_SIZES).map(drop)
    }

    fn generate(&self, params: &serde_json::Value) -> Result<Vec<u8>> {
        self.validate_params(params)?;
        let size = parse_params(params)?.key_size.unwrap_or(32);
        AeadKey::new(random_key(size).to_vec()).encode()
    }

    fn primitive(&self, kind: PrimitiveKind, key: &[u8]) -> Result<Primitive> {
        if kind != PrimitiveKind::Aead {
            return Err(KeysetError::UnsupportedPrimitive {
                type_url: AES_GCM_TYPE_URL.to_string(),
                primitive: kind,
            });
        }
        let key = AeadKey::decode(key, Self::KEY_SIZES)?;
        Ok(Primitive::Aead(Self::cipher(&key)?))
    }
}

#[cfg(feature = "chacha20")]
fixed_size_aead_handler!(
    /// ChaCha20-Poly1305 with 256-bit keys and 12-byte random nonces
    ChaCha20Poly1305KeyHandler,
    CHACHA20_POLY1305_TYPE_URL,
    32,
    chacha20poly1305::ChaCha20Poly1305,
    "ChaCha20-Poly1305"
);

#[cfg(feature = "chacha20")]
fixed_size_aead_handler!(
    /// XChaCha20-Poly1305 with 256-bit keys and 24-byte random nonces
    XChaCha20Poly1305KeyHandler,
    XCHACHA20_POLY1305_TYPE_URL,
    32,
    chacha20poly1305::XChaCha20Poly1305,
    "XChaCha20-Poly1305"
);
