//! Which key families get registered, and with which KMS clients

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tessera_key::{
    KeyRegistry, KeysetError, KmsClients, KmsEnvelopeKeyHandler, LOCAL_KMS_PREFIX, LocalKmsClient,
    Result,
};

fn enabled() -> bool {
    true
}

/// Registration switches; every family is on unless turned off
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// AEAD key types plus the KMS envelope key type
    #[serde(default = "enabled")]
    pub aead: bool,
    /// HMAC key types
    #[serde(default = "enabled")]
    pub mac: bool,
    /// ECDSA key types
    #[serde(default = "enabled")]
    pub signature: bool,
    /// ML-DSA key types
    #[serde(default = "enabled")]
    pub pq_signature: bool,
    /// Install the in-process `local-kms://` client
    #[serde(default = "enabled")]
    pub local_kms: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aead: true,
            mac: true,
            signature: true,
            pq_signature: true,
            local_kms: true,
        }
    }
}

impl Config {
    /// Parse a JSON configuration; missing fields default to `true`
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed JSON or unknown fields.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(KeysetError::serialization)
    }

    /// Register with the global registry and KMS client list
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if a foreign handler owns one of the type URLs.
    pub fn register(&self) -> Result<()> {
        self.register_with(KeyRegistry::global(), KmsClients::global())
    }

    /// Register with a specific registry and KMS client list
    ///
    /// Safe to call repeatedly. Families whose crate feature is disabled are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if a foreign handler owns one of the type URLs.
    pub fn register_with(
        &self,
        registry: &'static KeyRegistry,
        clients: &'static KmsClients,
    ) -> Result<()> {
        if self.aead {
            register_aead(registry)?;
            registry.register_handler(KmsEnvelopeKeyHandler::with(registry, clients))?;
        }
        if self.mac {
            register_mac(registry)?;
        }
        if self.signature {
            register_signature(registry)?;
        }
        if self.pq_signature {
            register_pq_signature(registry)?;
        }
        if self.local_kms && clients.get(LOCAL_KMS_PREFIX).is_err() {
            clients.add(Arc::new(LocalKmsClient::with_registry(registry)));
        }
        tracing::debug!(config = ?self, "registered key families");
        Ok(())
    }
}

#[cfg(feature = "aead")]
fn register_aead(registry: &KeyRegistry) -> Result<()> {
    tessera_cipher::register_with(registry)
}

#[cfg(not(feature = "aead"))]
fn register_aead(_registry: &KeyRegistry) -> Result<()> {
    tracing::warn!("aead family requested but the `aead` feature is disabled");
    Ok(())
}

#[cfg(feature = "mac")]
fn register_mac(registry: &KeyRegistry) -> Result<()> {
    tessera_hashing::register_with(registry)
}

#[cfg(not(feature = "mac"))]
fn register_mac(_registry: &KeyRegistry) -> Result<()> {
    tracing::warn!("mac family requested but the `mac` feature is disabled");
    Ok(())
}

#[cfg(feature = "signature")]
fn register_signature(registry: &KeyRegistry) -> Result<()> {
    tessera_signature::register_with(registry)
}

#[cfg(not(feature = "signature"))]
fn register_signature(_registry: &KeyRegistry) -> Result<()> {
    tracing::warn!("signature family requested but the `signature` feature is disabled");
    Ok(())
}

#[cfg(feature = "pqcrypto")]
fn register_pq_signature(registry: &KeyRegistry) -> Result<()> {
    tessera_pqcrypto::register_with(registry)
}

#[cfg(not(feature = "pqcrypto"))]
fn register_pq_signature(_registry: &KeyRegistry) -> Result<()> {
    tracing::warn!("pq_signature family requested but the `pqcrypto` feature is disabled");
    Ok(())
}
