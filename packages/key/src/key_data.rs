//! Type-tagged key material and key templates

use crate::access::SecretKeyAccess;
use crate::output_prefix::OutputPrefixKind;
use crate::{KeysetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// What kind of material a key value holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyMaterialKind {
    /// Symmetric secret key
    Symmetric,
    /// Private half of an asymmetric key pair
    AsymmetricPrivate,
    /// Public half of an asymmetric key pair
    AsymmetricPublic,
    /// Reference to a key held by a remote service
    Remote,
}

impl KeyMaterialKind {
    /// True for material that must never leave a secret-access boundary
    #[must_use]
    pub fn is_secret(self) -> bool {
        matches!(self, Self::Symmetric | Self::AsymmetricPrivate)
    }
}

/// Opaque key material tagged with the type URL of the handler that understands it
#[derive(Clone)]
pub struct KeyData {
    type_url: String,
    value: Zeroizing<Vec<u8>>,
    material_kind: KeyMaterialKind,
}

impl KeyData {
    /// Wrap encoded key material
    #[must_use]
    pub fn new(type_url: impl Into<String>, value: Vec<u8>, material_kind: KeyMaterialKind) -> Self {
        Self {
            type_url: type_url.into(),
            value: Zeroizing::new(value),
            material_kind,
        }
    }

    /// Type URL of the key handler for this material
    #[must_use]
    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    /// Kind of material held
    #[must_use]
    pub fn material_kind(&self) -> KeyMaterialKind {
        self.material_kind
    }

    /// Encoded key material; requires an explicit access token
    #[must_use]
    pub fn value(&self, _access: SecretKeyAccess) -> &[u8] {
        &self.value
    }

    /// Encoded key material for non-secret keys
    ///
    /// # Errors
    ///
    /// Returns `SecretKeyAccessDenied` if the material is secret.
    pub fn public_value(&self) -> Result<&[u8]> {
        if self.material_kind.is_secret() {
            return Err(KeysetError::SecretKeyAccessDenied);
        }
        Ok(&self.value)
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.value
    }
}

impl PartialEq for KeyData {
    fn eq(&self, other: &Self) -> bool {
        self.type_url == other.type_url
            && self.material_kind == other.material_kind
            && bool::from(self.value.as_slice().ct_eq(other.value.as_slice()))
    }
}

impl Eq for KeyData {}

impl fmt::Debug for KeyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyData")
            .field("type_url", &self.type_url)
            .field("material_kind", &self.material_kind)
            .field("value", &"REDACTED")
            .finish()
    }
}

/// Recipe for generating a new key: handler type, its parameters and framing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyTemplate {
    /// Type URL of the key handler
    pub type_url: String,
    /// Handler-specific parameters
    pub params: serde_json::Value,
    /// Output prefix for generated keys
    pub output_prefix: OutputPrefixKind,
}

impl KeyTemplate {
    /// Create a template
    #[must_use]
    pub fn new(
        type_url: impl Into<String>,
        params: serde_json::Value,
        output_prefix: OutputPrefixKind,
    ) -> Self {
        Self {
            type_url: type_url.into(),
            params,
            output_prefix,
        }
    }

    /// Same template with a different output prefix
    #[must_use]
    pub fn with_output_prefix(mut self, output_prefix: OutputPrefixKind) -> Self {
        self.output_prefix = output_prefix;
        self
    }
}
