//! Stored form of symmetric AEAD keys

use serde::{Deserialize, Serialize};
use tessera_key::{KeysetError, Result, encoding};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Only key structure version understood by this crate
pub(crate) const KEY_VERSION: u32 = 0;

/// Versioned raw key bytes
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub(crate) struct AeadKey {
    pub(crate) version: u32,
    pub(crate) key_value: Vec<u8>,
}

impl AeadKey {
    pub(crate) fn new(key_value: Vec<u8>) -> Self {
        Self {
            version: KEY_VERSION,
            key_value,
        }
    }

    /// Decode and check version and key length
    pub(crate) fn decode(bytes: &[u8], allowed_sizes: &[usize]) -> Result<Self> {
        let key: Self = encoding::decode(bytes)?;
        if key.version != KEY_VERSION {
            return Err(KeysetError::invalid_key(format!(
                "unsupported key version {}",
                key.version
            )));
        }
        if !allowed_sizes.contains(&key.key_value.len()) {
            return Err(KeysetError::invalid_key(format!(
                "invalid key size {} bytes",
                key.key_value.len()
            )));
        }
        Ok(key)
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        encoding::encode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_versions_are_rejected() {
        let mut key = AeadKey::new(vec![7; 32]);
        key.version = 1;
        let bytes = key.encode().unwrap();
        assert!(matches!(
            AeadKey::decode(&bytes, &[32]),
            Err(KeysetError::InvalidKey(_))
        ));
    }

    #[test]
    fn key_length_must_be_allowed() {
        let bytes = AeadKey::new(vec![7; 24]).encode().unwrap();
        assert!(AeadKey::decode(&bytes, &[16, 32]).is_err());
        assert!(AeadKey::decode(&bytes, &[24]).is_ok());
    }
}
