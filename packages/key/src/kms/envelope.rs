//! Envelope encryption: a fresh data key per message, wrapped by a KMS key
//!
//! Ciphertext layout: `be_u32(len(wrapped_dek)) || wrapped_dek || payload`.

use super::KmsClients;
use crate::access::SecretKeyAccess;
use crate::key_data::{KeyData, KeyMaterialKind, KeyTemplate};
use crate::output_prefix::OutputPrefixKind;
use crate::primitives::{Aead, Primitive, PrimitiveKind};
use crate::registry::{KeyHandler, KeyRegistry};
use crate::{KeysetError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zeroize::Zeroizing;

const WRAPPED_KEY_LEN_SIZE: usize = 4;

/// Type URL of remote envelope keys
pub const KMS_ENVELOPE_AEAD_TYPE_URL: &str = "type.tessera.dev/tessera.KmsEnvelopeAeadKey";

/// AEAD that encrypts each message under a new data key and wraps that key remotely
pub struct KmsEnvelopeAead {
    dek_template: KeyTemplate,
    dek_kind: KeyMaterialKind,
    remote: Arc<dyn Aead>,
    registry: &'static KeyRegistry,
}

impl KmsEnvelopeAead {
    /// Envelope AEAD generating data keys through the global registry
    ///
    /// # Errors
    ///
    /// Returns `UnknownKeyType` or `UnsupportedPrimitive` if the template does
    /// not describe a registered AEAD key type.
    pub fn new(dek_template: KeyTemplate, remote: Arc<dyn Aead>) -> Result<Self> {
        Self::with_registry(KeyRegistry::global(), dek_template, remote)
    }

    /// Envelope AEAD generating data keys through `registry`
    ///
    /// # Errors
    ///
    /// Returns `UnknownKeyType` or `UnsupportedPrimitive` if the template does
    /// not describe a registered AEAD key type.
    pub fn with_registry(
        registry: &'static KeyRegistry,
        dek_template: KeyTemplate,
        remote: Arc<dyn Aead>,
    ) -> Result<Self> {
        let handler = registry.lookup(&dek_template.type_url)?;
        if !handler.supported_primitives().contains(&PrimitiveKind::Aead) {
            return Err(KeysetError::UnsupportedPrimitive {
                type_url: dek_template.type_url,
                primitive: PrimitiveKind::Aead,
            });
        }
        handler.validate_params(&dek_template.params)?;
        Ok(Self {
            dek_kind: handler.material_kind(),
            dek_template,
            remote,
            registry,
        })
    }

    fn data_aead(&self, dek: &KeyData) -> Result<Arc<dyn Aead>> {
        self.registry
            .primitive(dek, PrimitiveKind::Aead)?
            .into_aead()
            .ok_or_else(|| KeysetError::UnsupportedPrimitive {
                type_url: dek.type_url().to_string(),
                primitive: PrimitiveKind::Aead,
            })
    }
}

impl Aead for KmsEnvelopeAead {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        let dek = self.registry.new_key_data(&self.dek_template)?;
        let wrapped = self
            .remote
            .encrypt(dek.value(SecretKeyAccess::insecure()), &[])?;
        let wrapped_len = u32::try_from(wrapped.len())
            .map_err(|_| KeysetError::backend("wrapped data key too large"))?;
        let payload = self.data_aead(&dek)?.encrypt(plaintext, associated_data)?;

        let mut out = Vec::with_capacity(WRAPPED_KEY_LEN_SIZE + wrapped.len() + payload.len());
        out.extend_from_slice(&wrapped_len.to_be_bytes());
        out.extend_from_slice(&wrapped);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < WRAPPED_KEY_LEN_SIZE {
            return Err(KeysetError::DecryptionFailed);
        }
        let (len_bytes, rest) = ciphertext.split_at(WRAPPED_KEY_LEN_SIZE);
        let wrapped_len = <[u8; WRAPPED_KEY_LEN_SIZE]>::try_from(len_bytes)
            .map(u32::from_be_bytes)
            .map_err(|_| KeysetError::DecryptionFailed)?;
        let wrapped_len =
            usize::try_from(wrapped_len).map_err(|_| KeysetError::DecryptionFailed)?;
        if wrapped_len > rest.len() {
            return Err(KeysetError::DecryptionFailed);
        }
        let (wrapped, payload) = rest.split_at(wrapped_len);

        let mut dek_value = Zeroizing::new(
            self.remote
                .decrypt(wrapped, &[])
                .map_err(KeysetError::into_decryption_failure)?,
        );
        let dek = KeyData::new(
            self.dek_template.type_url.clone(),
            std::mem::take(&mut *dek_value),
            self.dek_kind,
        );
        self.data_aead(&dek)
            .map_err(|_| KeysetError::DecryptionFailed)?
            .decrypt(payload, associated_data)
            .map_err(|_| KeysetError::DecryptionFailed)
    }
}

/// Parameters and stored form of a remote envelope key
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnvelopeKey {
    #[serde(default)]
    version: u32,
    kek_uri: String,
    dek_template: KeyTemplate,
}

impl EnvelopeKey {
    fn from_params(params: &serde_json::Value) -> Result<Self> {
        let key: Self = serde_json::from_value(params.clone())
            .map_err(|e| KeysetError::invalid_key(format!("envelope key parameters: {e}")))?;
        key.check()?;
        Ok(key)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let key: Self = serde_json::from_slice(bytes)
            .map_err(|e| KeysetError::invalid_key(format!("envelope key: {e}")))?;
        key.check()?;
        Ok(key)
    }

    fn check(&self) -> Result<()> {
        if self.version != 0 {
            return Err(KeysetError::invalid_key(format!(
                "unsupported envelope key version {}",
                self.version
            )));
        }
        if self.kek_uri.is_empty() {
            return Err(KeysetError::invalid_key("envelope key has no KEK URI"));
        }
        Ok(())
    }
}

/// Template for a remote envelope key wrapping data keys under `kek_uri`
#[must_use]
pub fn kms_envelope_aead_template(kek_uri: &str, dek_template: &KeyTemplate) -> KeyTemplate {
    KeyTemplate::new(
        KMS_ENVELOPE_AEAD_TYPE_URL,
        serde_json::json!({
            "kek_uri": kek_uri,
            "dek_template": dek_template,
        }),
        OutputPrefixKind::Raw,
    )
}

/// Key handler for remote envelope keys
///
/// The key material is only a reference: the KEK URI and the data key
/// template. The KEK is resolved through [`KmsClients`] whenever a primitive
/// is built.
#[derive(Clone, Copy, Debug)]
pub struct KmsEnvelopeKeyHandler {
    registry: &'static KeyRegistry,
    clients: &'static KmsClients,
}

impl KmsEnvelopeKeyHandler {
    /// Handler using the global registry and KMS clients
    #[must_use]
    pub fn new() -> Self {
        Self::with(KeyRegistry::global(), KmsClients::global())
    }

    /// Handler using explicit registry and KMS clients
    #[must_use]
    pub fn with(registry: &'static KeyRegistry, clients: &'static KmsClients) -> Self {
        Self { registry, clients }
    }
}

impl Default for KmsEnvelopeKeyHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyHandler for KmsEnvelopeKeyHandler {
    fn type_url(&self) -> &str {
        KMS_ENVELOPE_AEAD_TYPE_URL
    }

    fn material_kind(&self) -> KeyMaterialKind {
        KeyMaterialKind::Remote
    }

    fn supported_primitives(&self) -> &[PrimitiveKind] {
        &[PrimitiveKind::Aead]
    }

    fn validate_params(&self, params: &serde_json::Value) -> Result<()> {
        EnvelopeKey::from_params(params).map(|_| ())
    }

    fn validate_key(&self, key: &[u8]) -> Result<()> {
        EnvelopeKey::from_bytes(key).map(|_| ())
    }

    fn generate(&self, params: &serde_json::Value) -> Result<Vec<u8>> {
        let key = EnvelopeKey::from_params(params)?;
        serde_json::to_vec(&key).map_err(KeysetError::serialization)
    }

    fn primitive(&self, _kind: PrimitiveKind, key: &[u8]) -> Result<Primitive> {
        let key = EnvelopeKey::from_bytes(key)?;
        let remote = self.clients.get(&key.kek_uri)?.get_aead(&key.kek_uri, None)?;
        let aead = KmsEnvelopeAead::with_registry(self.registry, key.dek_template, remote)?;
        Ok(Primitive::Aead(Arc::new(aead)))
    }
}
