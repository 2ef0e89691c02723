use super::{WrappedPrimitive, log_backend_failure};
use crate::bundle::PrimitiveBundle;
use crate::keyset::Keyset;
use crate::primitives::{Aead, Primitive, PrimitiveKind};
use crate::registry::KeyRegistry;
use crate::{KeysetError, Result};

/// AEAD over every enabled key of a keyset
pub struct WrappedAead {
    bundle: PrimitiveBundle<dyn Aead>,
}

impl WrappedAead {
    /// Id of the key used for encryption
    #[must_use]
    pub fn primary_key_id(&self) -> Option<u32> {
        super::primary_key_id(&self.bundle)
    }
}

impl WrappedPrimitive for WrappedAead {
    const KIND: PrimitiveKind = PrimitiveKind::Aead;

    fn from_keyset(keyset: &Keyset, registry: &KeyRegistry) -> Result<Self> {
        let bundle = PrimitiveBundle::build(keyset, registry, Self::KIND, Primitive::into_aead)?;
        Ok(Self { bundle })
    }
}

impl Aead for WrappedAead {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        let primary = self.bundle.primary()?;
        let ciphertext = primary
            .primitive
            .encrypt(plaintext, associated_data)
            .map_err(|e| log_backend_failure("encrypt", e))?;
        tracing::trace!(key_id = primary.key_id, "encrypted with primary key");
        Ok(primary.prefix.frame(&ciphertext))
    }

    /// Failures collapse to `DecryptionFailed`, except that a retryable KMS
    /// failure from any candidate is returned when no candidate succeeds.
    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        let mut outage = None;
        let plaintext = self.bundle.consume(ciphertext, |entry, payload| {
            entry
                .primitive
                .decrypt(payload, associated_data)
                .map_err(|err| {
                    if err.is_transient() && outage.is_none() {
                        outage = Some(err);
                        KeysetError::DecryptionFailed
                    } else {
                        err
                    }
                })
        });
        plaintext.ok_or_else(|| {
            outage.unwrap_or_else(|| {
                tracing::debug!("no key decrypted the ciphertext");
                KeysetError::DecryptionFailed
            })
        })
    }
}
