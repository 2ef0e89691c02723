//! Primitive bundles: one instantiated primitive per enabled key, indexed by output prefix

use crate::keyset::{KeyStatus, Keyset};
use crate::output_prefix::{NON_RAW_PREFIX_SIZE, OutputPrefix, OutputPrefixKind};
use crate::primitives::{Primitive, PrimitiveKind};
use crate::registry::KeyRegistry;
use crate::{KeysetError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// A primitive instantiated from one key entry
pub struct BundleEntry<P: ?Sized> {
    /// The instantiated primitive
    pub primitive: Arc<P>,
    /// Id of the originating key
    pub key_id: u32,
    /// Output prefix kind of the originating key
    pub output_prefix_kind: OutputPrefixKind,
    /// Computed prefix bytes
    pub prefix: OutputPrefix,
}

impl<P: ?Sized> Clone for BundleEntry<P> {
    fn clone(&self) -> Self {
        Self {
            primitive: Arc::clone(&self.primitive),
            key_id: self.key_id,
            output_prefix_kind: self.output_prefix_kind,
            prefix: self.prefix,
        }
    }
}

/// Immutable set of primitives built from a keyset for one capability
pub struct PrimitiveBundle<P: ?Sized> {
    entries: HashMap<OutputPrefix, Vec<BundleEntry<P>>>,
    primary: Option<BundleEntry<P>>,
    len: usize,
}

impl<P: ?Sized> PrimitiveBundle<P> {
    /// Instantiate every enabled entry of `keyset` as `kind`
    ///
    /// Any entry that fails aborts construction with its error.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKeyType`, `UnsupportedPrimitive` or `InvalidKey` from
    /// the first failing entry, or `InvalidKeyset` if no key is enabled.
    pub fn build(
        keyset: &Keyset,
        registry: &KeyRegistry,
        kind: PrimitiveKind,
        extract: fn(Primitive) -> Option<Arc<P>>,
    ) -> Result<Self> {
        let mut entries: HashMap<OutputPrefix, Vec<BundleEntry<P>>> = HashMap::new();
        let mut primary = None;
        let mut len = 0;

        for entry in keyset
            .entries()
            .iter()
            .filter(|e| e.status() == KeyStatus::Enabled)
        {
            let key_data = entry.key_data().ok_or_else(|| {
                KeysetError::invalid_keyset(format!("enabled key {} has no material", entry.key_id()))
            })?;
            let primitive = extract(registry.primitive(key_data, kind)?).ok_or_else(|| {
                KeysetError::UnsupportedPrimitive {
                    type_url: entry.type_url().to_string(),
                    primitive: kind,
                }
            })?;
            let prefix = entry.output_prefix().prefix(entry.key_id());
            let bundled = BundleEntry {
                primitive,
                key_id: entry.key_id(),
                output_prefix_kind: entry.output_prefix(),
                prefix,
            };
            if entry.is_primary() {
                primary = Some(bundled.clone());
            }
            entries.entry(prefix).or_default().push(bundled);
            len += 1;
        }

        if len == 0 {
            return Err(KeysetError::invalid_keyset("keyset has no enabled keys"));
        }
        tracing::trace!(%kind, keys = len, has_primary = primary.is_some(), "built primitive bundle");
        Ok(Self {
            entries,
            primary,
            len,
        })
    }

    /// The primary entry, used for every producing operation
    ///
    /// # Errors
    ///
    /// Returns `NoPrimaryKey` if the keyset had no primary.
    pub fn primary(&self) -> Result<&BundleEntry<P>> {
        self.primary.as_ref().ok_or(KeysetError::NoPrimaryKey)
    }

    /// Entries registered under `prefix`, in keyset order
    #[must_use]
    pub fn entries_for_prefix(&self, prefix: &OutputPrefix) -> &[BundleEntry<P>] {
        self.entries.get(prefix).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entries with an empty prefix, in keyset order
    #[must_use]
    pub fn raw_entries(&self) -> &[BundleEntry<P>] {
        self.entries_for_prefix(&OutputPrefix::Raw)
    }

    /// Number of instantiated primitives
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false for a successfully built bundle
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Run the consumption trial order over `input`
    ///
    /// Candidates whose prefix matches the first five bytes are tried with the
    /// remaining bytes, then every raw entry is tried with the whole input.
    /// Returns the first success; individual failures are discarded.
    pub fn consume<T>(
        &self,
        input: &[u8],
        mut attempt: impl FnMut(&BundleEntry<P>, &[u8]) -> Result<T>,
    ) -> Option<T> {
        if let Some(prefix) = OutputPrefix::from_input(input) {
            let (_, payload) = input.split_at(NON_RAW_PREFIX_SIZE);
            for candidate in self.entries_for_prefix(&prefix) {
                if let Ok(output) = attempt(candidate, payload) {
                    return Some(output);
                }
            }
        }
        for candidate in self.raw_entries() {
            if let Ok(output) = attempt(candidate, input) {
                return Some(output);
            }
        }
        None
    }
}
