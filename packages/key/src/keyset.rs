//! Keyset model: key entries, status lifecycle and cross-entry invariants
//!
//! A [`Keyset`] is an immutable value. Every mutation returns a new, validated
//! keyset and leaves the original untouched.

use crate::key_data::KeyData;
use crate::output_prefix::OutputPrefixKind;
use crate::{KeysetError, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Lifecycle state of a key entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyStatus {
    /// Usable for producing (if primary) and consuming
    Enabled,
    /// Retained but unusable until re-enabled
    Disabled,
    /// Material discarded; id and metadata kept
    Destroyed,
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
            Self::Destroyed => "DESTROYED",
        };
        f.write_str(name)
    }
}

/// One key version inside a keyset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEntry {
    pub(crate) key_id: u32,
    pub(crate) type_url: String,
    pub(crate) status: KeyStatus,
    pub(crate) output_prefix: OutputPrefixKind,
    pub(crate) is_primary: bool,
    pub(crate) key_data: Option<KeyData>,
}

impl KeyEntry {
    /// Non-primary entry holding key material
    #[must_use]
    pub fn new(
        key_id: u32,
        key_data: KeyData,
        status: KeyStatus,
        output_prefix: OutputPrefixKind,
    ) -> Self {
        Self {
            key_id,
            type_url: key_data.type_url().to_string(),
            status,
            output_prefix,
            is_primary: false,
            key_data: Some(key_data),
        }
    }

    /// Entry for a destroyed key: metadata only
    #[must_use]
    pub fn destroyed(key_id: u32, type_url: impl Into<String>, output_prefix: OutputPrefixKind) -> Self {
        Self {
            key_id,
            type_url: type_url.into(),
            status: KeyStatus::Destroyed,
            output_prefix,
            is_primary: false,
            key_data: None,
        }
    }

    /// Mark this entry as the primary
    #[must_use]
    pub fn into_primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Key id, unique within the keyset
    #[must_use]
    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    /// Type URL of the key handler
    #[must_use]
    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> KeyStatus {
        self.status
    }

    /// Output prefix kind
    #[must_use]
    pub fn output_prefix(&self) -> OutputPrefixKind {
        self.output_prefix
    }

    /// Whether this entry is the keyset's primary
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Key material; absent once destroyed
    #[must_use]
    pub fn key_data(&self) -> Option<&KeyData> {
        self.key_data.as_ref()
    }

    fn info(&self) -> KeyInfo {
        KeyInfo {
            key_id: self.key_id,
            type_url: self.type_url.clone(),
            status: self.status,
            output_prefix: self.output_prefix,
        }
    }
}

/// Non-secret description of one key entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Key id
    pub key_id: u32,
    /// Type URL of the key handler
    pub type_url: String,
    /// Current status
    pub status: KeyStatus,
    /// Output prefix kind
    pub output_prefix: OutputPrefixKind,
}

/// Non-secret summary of a keyset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysetInfo {
    /// Primary key id, if any
    pub primary_key_id: Option<u32>,
    /// Per-entry summary, in keyset order
    pub keys: Vec<KeyInfo>,
}

/// Ordered collection of key entries
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Keyset {
    entries: Vec<KeyEntry>,
}

impl Keyset {
    /// Empty keyset; not valid until a key is added
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a keyset from entries and validate it
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyset` if the entries break a keyset invariant.
    pub fn from_entries(entries: Vec<KeyEntry>) -> Result<Self> {
        let keyset = Self { entries };
        keyset.validate()?;
        Ok(keyset)
    }

    /// Entries in keyset order
    #[must_use]
    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    /// Number of entries, destroyed ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the keyset has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry with the given id
    #[must_use]
    pub fn entry(&self, key_id: u32) -> Option<&KeyEntry> {
        self.entries.iter().find(|e| e.key_id == key_id)
    }

    /// The primary entry, if any
    #[must_use]
    pub fn primary(&self) -> Option<&KeyEntry> {
        self.entries.iter().find(|e| e.is_primary)
    }

    /// Check every cross-entry invariant
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyset` naming the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(KeysetError::invalid_keyset("keyset has no keys"));
        }

        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut primaries = 0usize;
        for entry in &self.entries {
            if !seen.insert(entry.key_id) {
                return Err(KeysetError::invalid_keyset(format!(
                    "duplicate key id {}",
                    entry.key_id
                )));
            }
            if entry.is_primary {
                primaries += 1;
                if entry.status != KeyStatus::Enabled {
                    return Err(KeysetError::invalid_keyset(format!(
                        "primary key {} is {}",
                        entry.key_id, entry.status
                    )));
                }
            }
            match (entry.status, entry.key_data.is_some()) {
                (KeyStatus::Destroyed, true) => {
                    return Err(KeysetError::invalid_keyset(format!(
                        "destroyed key {} still holds material",
                        entry.key_id
                    )));
                }
                (KeyStatus::Enabled | KeyStatus::Disabled, false) => {
                    return Err(KeysetError::invalid_keyset(format!(
                        "key {} has no material",
                        entry.key_id
                    )));
                }
                _ => {}
            }
        }

        if primaries > 1 {
            return Err(KeysetError::invalid_keyset(format!(
                "{primaries} primary keys"
            )));
        }
        Ok(())
    }

    /// Append a key, allocating a fresh random id unless one is forced
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyset` if a forced id collides, or `InvalidKey` when
    /// adding an already destroyed key.
    pub fn with_key(
        &self,
        key_data: KeyData,
        output_prefix: OutputPrefixKind,
        status: KeyStatus,
        key_id: Option<u32>,
    ) -> Result<(Self, u32)> {
        if status == KeyStatus::Destroyed {
            return Err(KeysetError::invalid_key("cannot add a destroyed key"));
        }
        let key_id = match key_id {
            Some(id) if self.entry(id).is_some() => {
                return Err(KeysetError::invalid_keyset(format!(
                    "duplicate key id {id}"
                )));
            }
            Some(id) => id,
            None => self.fresh_key_id(),
        };

        let mut next = self.clone();
        next.entries
            .push(KeyEntry::new(key_id, key_data, status, output_prefix));
        next.validate()?;
        Ok((next, key_id))
    }

    /// Make `key_id` the primary
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the key is absent or not enabled.
    pub fn with_primary(&self, key_id: u32) -> Result<Self> {
        match self.entry(key_id) {
            None => {
                return Err(KeysetError::invalid_key(format!(
                    "key {key_id} not found"
                )));
            }
            Some(entry) if entry.status != KeyStatus::Enabled => {
                return Err(KeysetError::invalid_key(format!(
                    "key {key_id} is {} and cannot be primary",
                    entry.status
                )));
            }
            Some(_) => {}
        }

        let mut next = self.clone();
        for entry in &mut next.entries {
            entry.is_primary = entry.key_id == key_id;
        }
        next.validate()?;
        Ok(next)
    }

    /// Change the status of `key_id`
    ///
    /// Destroying discards material and cannot be undone. Leaving `Enabled`
    /// clears the primary flag.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the key is absent or already destroyed.
    pub fn with_status(&self, key_id: u32, status: KeyStatus) -> Result<Self> {
        let mut next = self.clone();
        let entry = next
            .entries
            .iter_mut()
            .find(|e| e.key_id == key_id)
            .ok_or_else(|| KeysetError::invalid_key(format!("key {key_id} not found")))?;

        if entry.status == KeyStatus::Destroyed {
            if status == KeyStatus::Destroyed {
                return Ok(next);
            }
            return Err(KeysetError::invalid_key(format!(
                "key {key_id} is destroyed"
            )));
        }

        entry.status = status;
        if status != KeyStatus::Enabled {
            entry.is_primary = false;
        }
        if status == KeyStatus::Destroyed {
            entry.key_data = None;
        }
        next.validate()?;
        Ok(next)
    }

    /// Remove `key_id` entirely
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the key is absent or primary, or
    /// `InvalidKeyset` if it is the last key.
    pub fn without_key(&self, key_id: u32) -> Result<Self> {
        let entry = self
            .entry(key_id)
            .ok_or_else(|| KeysetError::invalid_key(format!("key {key_id} not found")))?;
        if entry.is_primary {
            return Err(KeysetError::invalid_key(format!(
                "key {key_id} is primary and cannot be deleted"
            )));
        }
        let next = Self {
            entries: self
                .entries
                .iter()
                .filter(|e| e.key_id != key_id)
                .cloned()
                .collect(),
        };
        next.validate()?;
        Ok(next)
    }

    /// Non-secret summary
    #[must_use]
    pub fn info(&self) -> KeysetInfo {
        KeysetInfo {
            primary_key_id: self.primary().map(KeyEntry::key_id),
            keys: self.entries.iter().map(KeyEntry::info).collect(),
        }
    }

    /// Whether any entry holds symmetric or private key material
    #[must_use]
    pub fn has_secret_material(&self) -> bool {
        self.entries.iter().any(|e| {
            e.key_data
                .as_ref()
                .is_some_and(|data| data.material_kind().is_secret())
        })
    }

    fn fresh_key_id(&self) -> u32 {
        let mut rng = rand::rng();
        loop {
            let candidate = rng.next_u32();
            if self.entry(candidate).is_none() {
                return candidate;
            }
            tracing::trace!("resampling colliding key id");
        }
    }
}
