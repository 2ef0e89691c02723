//! Serde documents for plain and encrypted keysets

use crate::key_data::{KeyData, KeyMaterialKind};
use crate::keyset::{KeyEntry, KeyStatus, Keyset, KeysetInfo};
use crate::output_prefix::OutputPrefixKind;
use crate::{KeysetError, Result};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Byte fields: base64 strings in human-readable formats, raw bytes otherwise
pub(crate) mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use zeroize::Zeroizing;

    pub(crate) fn serialize<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        if serializer.is_human_readable() {
            let encoded = Zeroizing::new(STANDARD.encode(bytes.as_ref()));
            serializer.serialize_str(&encoded)
        } else {
            bytes.as_ref().serialize(serializer)
        }
    }

    pub(crate) fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: From<Vec<u8>>,
    {
        if deserializer.is_human_readable() {
            let encoded = Zeroizing::new(String::deserialize(deserializer)?);
            STANDARD
                .decode(encoded.as_bytes())
                .map(T::from)
                .map_err(serde::de::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer).map(T::from)
        }
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct KeysetDocument {
    pub(crate) primary_key_id: Option<u32>,
    pub(crate) keys: Vec<EntryDocument>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct EntryDocument {
    pub(crate) key_id: u32,
    pub(crate) type_url: String,
    pub(crate) status: KeyStatus,
    pub(crate) output_prefix: OutputPrefixKind,
    pub(crate) key_data: Option<KeyDataDocument>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct KeyDataDocument {
    #[serde(with = "base64_bytes")]
    pub(crate) value: Zeroizing<Vec<u8>>,
    pub(crate) material_kind: KeyMaterialKind,
}

impl KeysetDocument {
    pub(crate) fn from_keyset(keyset: &Keyset) -> Self {
        Self {
            primary_key_id: keyset.primary().map(KeyEntry::key_id),
            keys: keyset
                .entries()
                .iter()
                .map(|entry| EntryDocument {
                    key_id: entry.key_id,
                    type_url: entry.type_url.clone(),
                    status: entry.status,
                    output_prefix: entry.output_prefix,
                    key_data: entry.key_data.as_ref().map(|data| KeyDataDocument {
                        value: Zeroizing::new(data.bytes().to_vec()),
                        material_kind: data.material_kind(),
                    }),
                })
                .collect(),
        }
    }

    pub(crate) fn has_secret_material(&self) -> bool {
        self.keys.iter().any(|entry| {
            entry
                .key_data
                .as_ref()
                .is_some_and(|data| data.material_kind.is_secret())
        })
    }

    pub(crate) fn into_keyset(self) -> Result<Keyset> {
        let primary = self.primary_key_id;
        if let Some(id) = primary {
            if !self.keys.iter().any(|entry| entry.key_id == id) {
                return Err(KeysetError::invalid_keyset(format!(
                    "primary key {id} is not in the keyset"
                )));
            }
        }

        let entries = self
            .keys
            .into_iter()
            .map(|entry| {
                let key_data = entry.key_data.map(|mut data| {
                    KeyData::new(
                        entry.type_url.clone(),
                        std::mem::take(&mut *data.value),
                        data.material_kind,
                    )
                });
                KeyEntry {
                    key_id: entry.key_id,
                    type_url: entry.type_url,
                    status: entry.status,
                    output_prefix: entry.output_prefix,
                    is_primary: primary == Some(entry.key_id),
                    key_data,
                }
            })
            .collect();
        Keyset::from_entries(entries)
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct EncryptedKeysetDocument {
    pub(crate) master_key_uri: String,
    pub(crate) keyset_info: KeysetInfo,
    #[serde(with = "base64_bytes")]
    pub(crate) encrypted_keyset: Vec<u8>,
}

/// Wrapper metadata authenticated alongside the encrypted keyset
#[derive(Serialize)]
pub(crate) struct WrapperHeader<'a> {
    pub(crate) master_key_uri: &'a str,
    pub(crate) keyset_info: &'a KeysetInfo,
}
