//! HMAC keys: stored form, parameter checks and the MAC primitive

use hmac::Hmac;
use hmac::digest::KeyInit;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tessera_key::{
    KeyHandler, KeyMaterialKind, KeysetError, Mac, Primitive, PrimitiveKind, Result, encoding,
};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Type URL of HMAC keys
pub const HMAC_TYPE_URL: &str = "type.tessera.dev/tessera.HmacKey";

/// Shortest accepted key
pub const MIN_KEY_SIZE: usize = 16;
/// Shortest accepted tag
pub const MIN_TAG_SIZE: usize = 10;

const KEY_VERSION: u32 = 0;

/// Digest underlying the HMAC
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashType {
    /// SHA-256, 32-byte tags at most
    #[serde(rename = "SHA256")]
    Sha256,
    /// SHA-384, 48-byte tags at most
    #[serde(rename = "SHA384")]
    Sha384,
    /// SHA-512, 64-byte tags at most
    #[serde(rename = "SHA512")]
    Sha512,
}

impl HashType {
    /// Digest output length in bytes
    #[must_use]
    pub fn digest_size(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    fn check_tag_size(self, tag_size: usize) -> Result<()> {
        if tag_size < MIN_TAG_SIZE || tag_size > self.digest_size() {
            return Err(KeysetError::invalid_key(format!(
                "tag size {tag_size} outside {MIN_TAG_SIZE}..={} for {self:?}",
                self.digest_size()
            )));
        }
        Ok(())
    }
}

/// Template parameters
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HmacParams {
    hash: HashType,
    tag_size: usize,
    key_size: usize,
}

impl HmacParams {
    fn parse(params: &serde_json::Value) -> Result<Self> {
        let params = Self::deserialize(params)
            .map_err(|e| KeysetError::invalid_key(format!("invalid HMAC parameters: {e}")))?;
        if params.key_size < MIN_KEY_SIZE {
            return Err(KeysetError::invalid_key(format!(
                "HMAC key size {} is below {MIN_KEY_SIZE}",
                params.key_size
            )));
        }
        params.hash.check_tag_size(params.tag_size)?;
        Ok(params)
    }
}

/// Stored form of an HMAC key
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct HmacKey {
    version: u32,
    #[zeroize(skip)]
    hash: HashType,
    tag_size: u32,
    key_value: Vec<u8>,
}

impl HmacKey {
    fn decode(bytes: &[u8]) -> Result<Self> {
        let key: Self = encoding::decode(bytes)?;
        if key.version != KEY_VERSION {
            return Err(KeysetError::invalid_key(format!(
                "unsupported key version {}",
                key.version
            )));
        }
        if key.key_value.len() < MIN_KEY_SIZE {
            return Err(KeysetError::invalid_key("HMAC key is too short"));
        }
        key.hash.check_tag_size(key.tag_size as usize)?;
        Ok(key)
    }
}

fn full_tag<M: hmac::Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as hmac::Mac>::new_from_slice(key)
        .map_err(|_| KeysetError::invalid_key("HMAC key rejected"))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// HMAC truncated to a fixed tag size
pub(crate) struct HmacPrimitive {
    hash: HashType,
    tag_size: usize,
    key: Zeroizing<Vec<u8>>,
}

impl HmacPrimitive {
    fn full_tag(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self.hash {
            HashType::Sha256 => full_tag::<Hmac<Sha256>>(&self.key, data),
            HashType::Sha384 => full_tag::<Hmac<Sha384>>(&self.key, data),
            HashType::Sha512 => full_tag::<Hmac<Sha512>>(&self.key, data),
        }
    }
}

impl Mac for HmacPrimitive {
    fn compute_mac(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut tag = self.full_tag(data)?;
        tag.truncate(self.tag_size);
        Ok(tag)
    }

    fn verify_mac(&self, tag: &[u8], data: &[u8]) -> Result<()> {
        if tag.len() != self.tag_size {
            return Err(KeysetError::VerificationFailed);
        }
        let expected = self.compute_mac(data)?;
        if bool::from(expected.ct_eq(tag)) {
            Ok(())
        } else {
            Err(KeysetError::VerificationFailed)
        }
    }
}

/// HMAC over SHA-2 with truncated tags
///
/// Template parameters: `{"hash": "SHA256", "tag_size": 32, "key_size": 32}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HmacKeyHandler;

impl KeyHandler for HmacKeyHandler {
    fn type_url(&self) -> &str {
        HMAC_TYPE_URL
    }

    fn material_kind(&self) -> KeyMaterialKind {
        KeyMaterialKind::Symmetric
    }

    fn supported_primitives(&self) -> &[PrimitiveKind] {
        &[PrimitiveKind::Mac]
    }

    fn validate_params(&self, params: &serde_json::Value) -> Result<()> {
        HmacParams::parse(params).map(drop)
    }

    fn validate_key(&self, key: &[u8]) -> Result<()> {
        HmacKey::decode(key).map(drop)
    }

    fn generate(&self, params: &serde_json::Value) -> Result<Vec<u8>> {
        let params = HmacParams::parse(params)?;
        let mut key_value = vec![0u8; params.key_size];
        rand::rng().fill_bytes(&mut key_value);
        let tag_size = u32::try_from(params.tag_size)
            .map_err(|_| KeysetError::invalid_key("tag size out of range"))?;
        encoding::encode(&HmacKey {
            version: KEY_VERSION,
            hash: params.hash,
            tag_size,
            key_value,
        })
    }

    fn primitive(&self, kind: PrimitiveKind, key: &[u8]) -> Result<Primitive> {
        if kind != PrimitiveKind::Mac {
            return Err(KeysetError::UnsupportedPrimitive {
                type_url: HMAC_TYPE_URL.to_string(),
                primitive: kind,
            });
        }
        let key = HmacKey::decode(key)?;
        Ok(Primitive::Mac(Arc::new(HmacPrimitive {
            hash: key.hash,
            tag_size: key.tag_size as usize,
            key: Zeroizing::new(key.key_value.clone()),
        })))
    }
}
