//! Keyset serialization, optionally encrypted under a master key
//!
//! Two formats share one document model: compact binary (`bincode`) and JSON
//! with base64 key values. Encrypted keysets record the master key URI and a
//! non-secret [`KeysetInfo`](crate::keyset::KeysetInfo) summary next to the
//! ciphertext; both are bound into the master AEAD's associated data.

mod document;
mod encrypted;

use crate::access::SecretKeyAccess;
use crate::encoding;
use crate::handle::KeysetHandle;
use crate::registry::KeyRegistry;
use crate::{KeysetError, Result};
use document::KeysetDocument;
use serde::{Serialize, de::DeserializeOwned};

/// Wire format of serialized keysets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum KeysetFormat {
    /// Compact binary encoding
    #[default]
    Binary,
    /// JSON with base64-encoded key values
    Json,
}

/// Serializer and parser for keyset handles
#[derive(Clone, Copy, Debug, Default)]
pub struct KeysetCodec {
    format: KeysetFormat,
}

impl KeysetCodec {
    /// Codec for the given format
    #[must_use]
    pub fn new(format: KeysetFormat) -> Self {
        Self { format }
    }

    /// Binary codec
    #[must_use]
    pub fn binary() -> Self {
        Self::new(KeysetFormat::Binary)
    }

    /// JSON codec
    #[must_use]
    pub fn json() -> Self {
        Self::new(KeysetFormat::Json)
    }

    /// Format used by this codec
    #[must_use]
    pub fn format(&self) -> KeysetFormat {
        self.format
    }

    /// Serialize a keyset, secret material included
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyset` if the keyset fails validation.
    pub fn serialize(&self, handle: &KeysetHandle, _access: SecretKeyAccess) -> Result<Vec<u8>> {
        let keyset = handle.keyset();
        keyset.validate()?;
        let bytes = self.encode(&KeysetDocument::from_keyset(&keyset))?;
        tracing::debug!(format = ?self.format, keys = keyset.len(), "serialized keyset");
        Ok(bytes)
    }

    /// Serialize a keyset that holds no secret material
    ///
    /// # Errors
    ///
    /// Returns `SecretKeyAccessDenied` if any entry holds symmetric or private
    /// key material.
    pub fn serialize_without_secret(&self, handle: &KeysetHandle) -> Result<Vec<u8>> {
        let keyset = handle.keyset();
        if keyset.has_secret_material() {
            return Err(KeysetError::SecretKeyAccessDenied);
        }
        keyset.validate()?;
        self.encode(&KeysetDocument::from_keyset(&keyset))
    }

    /// Parse a keyset, secret material included
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed input or `InvalidKeyset` if the
    /// decoded keyset breaks an invariant.
    pub fn parse(&self, bytes: &[u8], _access: SecretKeyAccess) -> Result<KeysetHandle> {
        let document: KeysetDocument = self.decode(bytes)?;
        KeysetHandle::from_keyset(document.into_keyset()?)
    }

    /// Parse a keyset that must hold no secret material, checking key types
    /// against the global registry
    ///
    /// # Errors
    ///
    /// See [`KeysetCodec::parse_without_secret_with`].
    pub fn parse_without_secret(&self, bytes: &[u8]) -> Result<KeysetHandle> {
        self.parse_without_secret_with(bytes, KeyRegistry::global())
    }

    /// Parse a keyset that must hold no secret material
    ///
    /// Each entry's material kind is taken from its registered handler, so a
    /// secret key relabeled as public is still refused.
    ///
    /// # Errors
    ///
    /// Returns `SecretKeyAccessDenied` if any entry holds symmetric or private
    /// key material, `UnknownKeyType` for an unregistered key type, or
    /// `InvalidKey` for a mislabeled material kind.
    pub fn parse_without_secret_with(
        &self,
        bytes: &[u8],
        registry: &KeyRegistry,
    ) -> Result<KeysetHandle> {
        let document: KeysetDocument = self.decode(bytes)?;
        if document.has_secret_material() {
            return Err(KeysetError::SecretKeyAccessDenied);
        }
        let keyset = document.into_keyset()?;
        for key_data in keyset.entries().iter().filter_map(|entry| entry.key_data()) {
            registry.check_non_secret(key_data)?;
        }
        KeysetHandle::from_keyset(keyset)
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        match self.format {
            KeysetFormat::Binary => encoding::encode(value),
            KeysetFormat::Json => serde_json::to_vec(value).map_err(KeysetError::serialization),
        }
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self.format {
            KeysetFormat::Binary => encoding::decode(bytes),
            KeysetFormat::Json => serde_json::from_slice(bytes).map_err(KeysetError::serialization),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyset::KeyStatus;
    use crate::output_prefix::OutputPrefixKind;
    use crate::testing::{aead_template, mac_key, registry, signer_template};

    fn mixed_handle() -> KeysetHandle {
        let handle = KeysetHandle::generate_new_with(registry(), &aead_template()).unwrap();
        let legacy = handle
            .add_key(mac_key(), OutputPrefixKind::Legacy, KeyStatus::Disabled)
            .unwrap();
        let gone = handle
            .add_new_key_with(registry(), &aead_template().with_output_prefix(OutputPrefixKind::Raw))
            .unwrap();
        handle.destroy(gone).unwrap();
        assert!(handle.keyset().entry(legacy).is_some());
        handle
    }

    #[test]
    fn both_formats_round_trip() {
        let handle = mixed_handle();
        for codec in [KeysetCodec::binary(), KeysetCodec::json()] {
            let bytes = codec.serialize(&handle, SecretKeyAccess::insecure()).unwrap();
            let parsed = codec.parse(&bytes, SecretKeyAccess::insecure()).unwrap();
            assert_eq!(*parsed.keyset(), *handle.keyset());
        }
    }

    #[test]
    fn json_encodes_key_values_as_base64() {
        let handle = KeysetHandle::generate_new_with(registry(), &aead_template()).unwrap();
        let bytes = KeysetCodec::json()
            .serialize(&handle, SecretKeyAccess::insecure())
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let key = &value["keys"][0];
        assert_eq!(key["status"], "ENABLED");
        assert_eq!(key["output_prefix"], "TINK");
        assert_eq!(key["key_data"]["material_kind"], "SYMMETRIC");
        assert!(key["key_data"]["value"].is_string());
        assert_eq!(value["primary_key_id"], handle.primary_key_id().unwrap());
    }

    #[test]
    fn secret_keysets_need_access() {
        let handle = mixed_handle();
        let codec = KeysetCodec::binary();
        assert!(matches!(
            codec.serialize_without_secret(&handle),
            Err(KeysetError::SecretKeyAccessDenied)
        ));
        let bytes = codec.serialize(&handle, SecretKeyAccess::insecure()).unwrap();
        assert!(matches!(
            codec.parse_without_secret(&bytes),
            Err(KeysetError::SecretKeyAccessDenied)
        ));
    }

    #[test]
    fn public_keysets_parse_without_access() {
        let handle = KeysetHandle::generate_new_with(registry(), &signer_template()).unwrap();
        let public = handle.public_keyset_handle_with(registry()).unwrap();
        let codec = KeysetCodec::json();
        let bytes = codec.serialize_without_secret(&public).unwrap();
        let parsed = codec.parse_without_secret_with(&bytes, registry()).unwrap();
        assert_eq!(*parsed.keyset(), *public.keyset());
    }

    #[test]
    fn relabeled_secret_key_is_not_public() {
        let handle = KeysetHandle::generate_new_with(registry(), &aead_template()).unwrap();
        let codec = KeysetCodec::json();
        let bytes = codec.serialize(&handle, SecretKeyAccess::insecure()).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["keys"][0]["key_data"]["material_kind"] = serde_json::json!("ASYMMETRIC_PUBLIC");
        let relabeled = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            codec.parse_without_secret_with(&relabeled, registry()),
            Err(KeysetError::SecretKeyAccessDenied)
        ));

        // even when parsed with access, the mislabeled key never becomes a primitive
        let parsed = codec.parse(&relabeled, SecretKeyAccess::insecure()).unwrap();
        assert!(matches!(
            parsed.primitive_with::<crate::WrappedAead>(registry()),
            Err(KeysetError::InvalidKey(_))
        ));
    }

    #[test]
    fn dangling_primary_id_is_invalid() {
        let handle = KeysetHandle::generate_new_with(registry(), &aead_template()).unwrap();
        let codec = KeysetCodec::json();
        let bytes = codec.serialize(&handle, SecretKeyAccess::insecure()).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let bogus = handle.primary_key_id().unwrap().wrapping_add(1);
        value["primary_key_id"] = serde_json::json!(bogus);
        let tampered = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            codec.parse(&tampered, SecretKeyAccess::insecure()),
            Err(KeysetError::InvalidKeyset(_))
        ));
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        assert!(matches!(
            KeysetCodec::json().parse(b"{not json", SecretKeyAccess::insecure()),
            Err(KeysetError::Serialization(_))
        ));
        assert!(matches!(
            KeysetCodec::binary().parse(&[0xff; 3], SecretKeyAccess::insecure()),
            Err(KeysetError::Serialization(_))
        ));
    }
}
