//! In-process KMS whose key URIs embed a serialized keyset

use super::{Credentials, KmsClient};
use crate::access::SecretKeyAccess;
use crate::codec::KeysetCodec;
use crate::handle::KeysetHandle;
use crate::key_data::KeyTemplate;
use crate::primitives::Aead;
use crate::registry::KeyRegistry;
use crate::wrapper::WrappedAead;
use crate::{KeysetError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::sync::Arc;
use tessera_common::LoggingTransformer;
use zeroize::Zeroizing;

/// Scheme of local KMS key URIs
pub const LOCAL_KMS_PREFIX: &str = "local-kms://";

/// KMS client serving `local-kms://<base64url binary keyset>` URIs
///
/// The URI is the key: anyone holding it can decrypt. Intended for tests and
/// offline envelope encryption.
#[derive(Clone, Copy, Debug)]
pub struct LocalKmsClient {
    registry: &'static KeyRegistry,
}

impl LocalKmsClient {
    /// Client resolving keys through the global registry
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(KeyRegistry::global())
    }

    /// Client resolving keys through `registry`
    #[must_use]
    pub fn with_registry(registry: &'static KeyRegistry) -> Self {
        Self { registry }
    }

    /// Generate a fresh AEAD keyset and return its URI
    ///
    /// # Errors
    ///
    /// Returns the registry's error for the template.
    pub fn new_key_uri(&self, template: &KeyTemplate) -> Result<String> {
        let handle = KeysetHandle::generate_new_with(self.registry, template)?;
        Self::key_uri(&handle)
    }

    /// URI embedding `handle`'s keyset
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyset` if the keyset fails validation.
    pub fn key_uri(handle: &KeysetHandle) -> Result<String> {
        let bytes = Zeroizing::new(KeysetCodec::binary().serialize(handle, SecretKeyAccess::insecure())?);
        Ok(format!("{LOCAL_KMS_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes.as_slice())))
    }
}

impl Default for LocalKmsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KmsClient for LocalKmsClient {
    fn supports(&self, key_uri: &str) -> bool {
        key_uri.starts_with(LOCAL_KMS_PREFIX)
    }

    fn get_aead(&self, key_uri: &str, _credentials: Option<&Credentials>) -> Result<Arc<dyn Aead>> {
        let encoded = key_uri.strip_prefix(LOCAL_KMS_PREFIX).ok_or_else(|| {
            KeysetError::UnsupportedKeyUri(LoggingTransformer::secure_hash_key(key_uri))
        })?;
        let bytes = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(encoded)
                .map_err(|_| KeysetError::invalid_key("local KMS key URI is not base64url"))?,
        );
        let handle = KeysetCodec::binary().parse(&bytes, SecretKeyAccess::insecure())?;
        let aead: WrappedAead = handle.primitive_with(self.registry)?;
        LoggingTransformer::log_kms_operation("local get_aead", key_uri, false);
        Ok(Arc::new(aead))
    }
}
