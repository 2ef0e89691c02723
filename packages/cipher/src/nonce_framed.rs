//! Adapter from RustCrypto AEAD ciphers to keyset AEAD primitives
//!
//! Output layout: `nonce || ciphertext || tag`, with a fresh random nonce per
//! message.

#[cfg(feature = "aes")]
use aes_gcm::aead;
#[cfg(not(feature = "aes"))]
use chacha20poly1305::aead;

use aead::generic_array::GenericArray;
use aead::generic_array::typenum::Unsigned;
use aead::{Aead as RawAead, AeadCore, Payload};
use rand::RngCore;
use tessera_key::{Aead, KeysetError, Result};

pub(crate) struct NonceFramed<C> {
    cipher: C,
    name: &'static str,
}

impl<C> NonceFramed<C> {
    pub(crate) fn new(cipher: C, name: &'static str) -> Self {
        Self { cipher, name }
    }
}

impl<C> Aead for NonceFramed<C>
where
    C: RawAead + AeadCore + Send + Sync,
{
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = vec![0u8; C::NonceSize::USIZE];
        rand::rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(
                GenericArray::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|_| KeysetError::backend(format!("{} encryption failed", self.name)))?;

        let mut out = nonce;
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        let nonce_len = C::NonceSize::USIZE;
        if ciphertext.len() < nonce_len + C::TagSize::USIZE {
            return Err(KeysetError::DecryptionFailed);
        }
        let (nonce, body) = ciphertext.split_at(nonce_len);
        self.cipher
            .decrypt(
                GenericArray::from_slice(nonce),
                Payload {
                    msg: body,
                    aad: associated_data,
                },
            )
            .map_err(|_| KeysetError::DecryptionFailed)
    }
}
