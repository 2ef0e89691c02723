//! Keysets encrypted end-to-end under a master key

use super::KeysetCodec;
use super::document::{EncryptedKeysetDocument, KeysetDocument, WrapperHeader};
use crate::encoding;
use crate::handle::KeysetHandle;
use crate::keyset::KeysetInfo;
use crate::kms::MasterKey;
use crate::{KeysetError, Result};
use tessera_common::LoggingTransformer;
use zeroize::Zeroizing;

/// `be_u32(len(header)) || header || associated_data`
fn master_associated_data(
    master_key_uri: &str,
    keyset_info: &KeysetInfo,
    associated_data: &[u8],
) -> Result<Vec<u8>> {
    let header = encoding::encode(&WrapperHeader {
        master_key_uri,
        keyset_info,
    })?;
    let header_len = u32::try_from(header.len())
        .map_err(|_| KeysetError::serialization("wrapper header too large"))?;
    let mut aad = Vec::with_capacity(4 + header.len() + associated_data.len());
    aad.extend_from_slice(&header_len.to_be_bytes());
    aad.extend_from_slice(&header);
    aad.extend_from_slice(associated_data);
    Ok(aad)
}

impl KeysetCodec {
    /// Serialize a keyset and encrypt it under `master_key`
    ///
    /// The master key URI and keyset summary travel in the clear but are
    /// authenticated together with `associated_data`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyset` if the keyset fails validation, or the master
    /// AEAD's error.
    pub fn serialize_encrypted(
        &self,
        handle: &KeysetHandle,
        master_key: &MasterKey,
        associated_data: &[u8],
    ) -> Result<Vec<u8>> {
        let keyset = handle.keyset();
        keyset.validate()?;
        let plaintext = Zeroizing::new(encoding::encode(&KeysetDocument::from_keyset(&keyset))?);
        let keyset_info = keyset.info();
        let aad = master_associated_data(master_key.key_uri(), &keyset_info, associated_data)?;

        let encrypted_keyset = master_key.aead().encrypt(&plaintext, &aad).inspect_err(|err| {
            LoggingTransformer::log_kms_operation("encrypt keyset", master_key.key_uri(), err.is_transient());
        })?;
        LoggingTransformer::log_keyset_operation("serialize_encrypted", master_key.key_uri(), true);

        self.encode(&EncryptedKeysetDocument {
            master_key_uri: master_key.key_uri().to_string(),
            keyset_info,
            encrypted_keyset,
        })
    }

    /// Decrypt and parse a keyset produced by [`KeysetCodec::serialize_encrypted`]
    ///
    /// # Errors
    ///
    /// Returns `DecryptionFailed` if the wrapper names a different master key
    /// or the master key rejects the ciphertext, a retryable `Backend` error
    /// for transient KMS failures, and `Serialization` or `InvalidKeyset` for
    /// malformed contents.
    pub fn parse_encrypted(
        &self,
        bytes: &[u8],
        master_key: &MasterKey,
        associated_data: &[u8],
    ) -> Result<KeysetHandle> {
        let document: EncryptedKeysetDocument = self.decode(bytes)?;
        if document.master_key_uri != master_key.key_uri() {
            tracing::debug!("encrypted keyset names a different master key");
            return Err(KeysetError::DecryptionFailed);
        }

        let aad = master_associated_data(
            &document.master_key_uri,
            &document.keyset_info,
            associated_data,
        )?;
        let plaintext = master_key
            .aead()
            .decrypt(&document.encrypted_keyset, &aad)
            .map_err(|err| {
                LoggingTransformer::log_kms_operation(
                    "decrypt keyset",
                    master_key.key_uri(),
                    err.is_transient(),
                );
                err.into_decryption_failure()
            })
            .map(Zeroizing::new)?;

        let keyset = encoding::decode::<KeysetDocument>(&plaintext)?.into_keyset()?;
        if keyset.info() != document.keyset_info {
            return Err(KeysetError::invalid_keyset(
                "keyset summary does not match encrypted contents",
            ));
        }
        LoggingTransformer::log_keyset_operation("parse_encrypted", master_key.key_uri(), true);
        KeysetHandle::from_keyset(keyset)
    }

    /// Read the unencrypted summary stored next to an encrypted keyset
    ///
    /// The summary is only authenticated once the keyset is decrypted.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed input.
    pub fn encrypted_keyset_info(&self, bytes: &[u8]) -> Result<KeysetInfo> {
        let document: EncryptedKeysetDocument = self.decode(bytes)?;
        Ok(document.keyset_info)
    }
}
