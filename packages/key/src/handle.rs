//! Access-controlled owner of a keyset
//!
//! Readers take a snapshot with [`KeysetHandle::keyset`] and never lock.
//! Mutations are serialized, build a new validated keyset, and swap it in
//! atomically; a failed mutation leaves the held keyset untouched.

use crate::key_data::{KeyData, KeyTemplate};
use crate::keyset::{KeyEntry, KeyStatus, Keyset, KeysetInfo};
use crate::output_prefix::OutputPrefixKind;
use crate::registry::KeyRegistry;
use crate::wrapper::WrappedPrimitive;
use crate::Result;
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Owner of exactly one keyset
pub struct KeysetHandle {
    keyset: ArcSwap<Keyset>,
    writer: Mutex<()>,
}

impl KeysetHandle {
    /// Generate a handle holding one new primary key, using the global registry
    ///
    /// # Errors
    ///
    /// Returns the registry's error for an unknown type or invalid parameters.
    pub fn generate_new(template: &KeyTemplate) -> Result<Self> {
        Self::generate_new_with(KeyRegistry::global(), template)
    }

    /// Generate a handle holding one new primary key
    ///
    /// # Errors
    ///
    /// Returns the registry's error for an unknown type or invalid parameters.
    pub fn generate_new_with(registry: &KeyRegistry, template: &KeyTemplate) -> Result<Self> {
        let key_data = registry.new_key_data(template)?;
        let (keyset, key_id) =
            Keyset::new().with_key(key_data, template.output_prefix, KeyStatus::Enabled, None)?;
        let keyset = keyset.with_primary(key_id)?;
        tracing::debug!(key_id, type_url = %template.type_url, "generated keyset");
        Self::from_keyset(keyset)
    }

    /// Take ownership of a keyset after validating it
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyset` if the keyset breaks an invariant.
    pub fn from_keyset(keyset: Keyset) -> Result<Self> {
        keyset.validate()?;
        Ok(Self {
            keyset: ArcSwap::from_pointee(keyset),
            writer: Mutex::new(()),
        })
    }

    /// Current keyset snapshot
    #[must_use]
    pub fn keyset(&self) -> Arc<Keyset> {
        self.keyset.load_full()
    }

    /// Non-secret summary of the current keyset
    #[must_use]
    pub fn info(&self) -> KeysetInfo {
        self.keyset.load().info()
    }

    /// Id of the current primary key
    #[must_use]
    pub fn primary_key_id(&self) -> Option<u32> {
        self.keyset.load().primary().map(KeyEntry::key_id)
    }

    /// Add a non-primary key under a fresh random id
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a destroyed status.
    pub fn add_key(
        &self,
        key_data: KeyData,
        output_prefix: OutputPrefixKind,
        status: KeyStatus,
    ) -> Result<u32> {
        self.insert(key_data, output_prefix, status, None)
    }

    /// Add a non-primary key under a caller-chosen id
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyset` if the id is taken.
    pub fn add_key_with_id(
        &self,
        key_id: u32,
        key_data: KeyData,
        output_prefix: OutputPrefixKind,
        status: KeyStatus,
    ) -> Result<u32> {
        self.insert(key_data, output_prefix, status, Some(key_id))
    }

    /// Generate and add an enabled, non-primary key from a template using the global registry
    ///
    /// # Errors
    ///
    /// Returns the registry's error for an unknown type or invalid parameters.
    pub fn add_new_key(&self, template: &KeyTemplate) -> Result<u32> {
        self.add_new_key_with(KeyRegistry::global(), template)
    }

    /// Generate and add an enabled, non-primary key from a template
    ///
    /// # Errors
    ///
    /// Returns the registry's error for an unknown type or invalid parameters.
    pub fn add_new_key_with(&self, registry: &KeyRegistry, template: &KeyTemplate) -> Result<u32> {
        let key_data = registry.new_key_data(template)?;
        self.add_key(key_data, template.output_prefix, KeyStatus::Enabled)
    }

    /// Rotate the primary to `key_id`
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the key is absent or not enabled.
    pub fn set_primary(&self, key_id: u32) -> Result<()> {
        self.mutate(|keyset| keyset.with_primary(key_id))?;
        tracing::debug!(key_id, "rotated primary key");
        Ok(())
    }

    /// Change the status of `key_id`
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the key is absent or already destroyed.
    pub fn set_status(&self, key_id: u32, status: KeyStatus) -> Result<()> {
        self.mutate(|keyset| keyset.with_status(key_id, status))?;
        tracing::debug!(key_id, %status, "changed key status");
        Ok(())
    }

    /// Enable `key_id`
    ///
    /// # Errors
    ///
    /// See [`KeysetHandle::set_status`].
    pub fn enable(&self, key_id: u32) -> Result<()> {
        self.set_status(key_id, KeyStatus::Enabled)
    }

    /// Disable `key_id`
    ///
    /// # Errors
    ///
    /// See [`KeysetHandle::set_status`].
    pub fn disable(&self, key_id: u32) -> Result<()> {
        self.set_status(key_id, KeyStatus::Disabled)
    }

    /// Destroy the material of `key_id`; irreversible
    ///
    /// # Errors
    ///
    /// See [`KeysetHandle::set_status`].
    pub fn destroy(&self, key_id: u32) -> Result<()> {
        self.set_status(key_id, KeyStatus::Destroyed)
    }

    /// Remove `key_id` from the keyset
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the key is absent or primary.
    pub fn delete_key(&self, key_id: u32) -> Result<()> {
        self.mutate(|keyset| keyset.without_key(key_id))?;
        tracing::debug!(key_id, "deleted key");
        Ok(())
    }

    /// Handle over the public halves of every private key, using the global registry
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if a live entry is not a private key.
    pub fn public_keyset_handle(&self) -> Result<Self> {
        self.public_keyset_handle_with(KeyRegistry::global())
    }

    /// Handle over the public halves of every private key
    ///
    /// Ids, statuses, prefixes and the primary are preserved. Destroyed
    /// entries carry over as metadata.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if a live entry is not a private key.
    pub fn public_keyset_handle_with(&self, registry: &KeyRegistry) -> Result<Self> {
        let keyset = self.keyset.load();
        let mut entries = Vec::with_capacity(keyset.len());
        for entry in keyset.entries() {
            let public = match entry.key_data() {
                Some(private) => {
                    let public = registry.public_key_data(private)?;
                    KeyEntry::new(entry.key_id(), public, entry.status(), entry.output_prefix())
                }
                None => KeyEntry::destroyed(entry.key_id(), entry.type_url(), entry.output_prefix()),
            };
            entries.push(if entry.is_primary() {
                public.into_primary()
            } else {
                public
            });
        }
        Self::from_keyset(Keyset::from_entries(entries)?)
    }

    /// Build a wrapped primitive over the enabled keys, using the global registry
    ///
    /// # Errors
    ///
    /// Returns the first entry's instantiation error.
    pub fn primitive<W: WrappedPrimitive>(&self) -> Result<W> {
        self.primitive_with(KeyRegistry::global())
    }

    /// Build a wrapped primitive over the enabled keys
    ///
    /// # Errors
    ///
    /// Returns the first entry's instantiation error.
    pub fn primitive_with<W: WrappedPrimitive>(&self, registry: &KeyRegistry) -> Result<W> {
        let keyset = self.keyset.load_full();
        W::from_keyset(&keyset, registry)
    }

    fn insert(
        &self,
        key_data: KeyData,
        output_prefix: OutputPrefixKind,
        status: KeyStatus,
        key_id: Option<u32>,
    ) -> Result<u32> {
        let mut assigned = 0;
        self.mutate(|keyset| {
            let (next, id) = keyset.with_key(key_data, output_prefix, status, key_id)?;
            assigned = id;
            Ok(next)
        })?;
        tracing::debug!(key_id = assigned, %output_prefix, "added key");
        Ok(assigned)
    }

    fn mutate(&self, change: impl FnOnce(&Keyset) -> Result<Keyset>) -> Result<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.keyset.load_full();
        let next = change(&current)?;
        next.validate()?;
        self.keyset.store(Arc::new(next));
        Ok(())
    }
}

impl Clone for KeysetHandle {
    fn clone(&self) -> Self {
        Self {
            keyset: ArcSwap::new(self.keyset.load_full()),
            writer: Mutex::new(()),
        }
    }
}

impl fmt::Debug for KeysetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeysetHandle")
            .field("info", &self.info())
            .finish()
    }
}
