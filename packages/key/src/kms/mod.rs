//! Key management service integration
//!
//! A [`KmsClient`] turns a key URI into an [`Aead`] held by some remote or
//! local service. [`KmsClients`] is the process-wide list of clients; the
//! first one claiming a URI serves it. Calls are blocking and carry no
//! timeout or retry policy; clients mark retryable failures with
//! [`KeysetError::transient`].

mod envelope;
mod local;

pub use envelope::{
    KMS_ENVELOPE_AEAD_TYPE_URL, KmsEnvelopeAead, KmsEnvelopeKeyHandler, kms_envelope_aead_template,
};
pub use local::{LOCAL_KMS_PREFIX, LocalKmsClient};

use crate::primitives::Aead;
use crate::{KeysetError, Result};
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tessera_common::LoggingTransformer;
use zeroize::Zeroizing;

/// Opaque credentials handed to a KMS client
#[derive(Clone)]
pub struct Credentials(Zeroizing<Vec<u8>>);

impl Credentials {
    /// Wrap credential bytes
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// Read credentials from a file
    ///
    /// # Errors
    ///
    /// Returns a permanent `Backend` error if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(KeysetError::backend)?;
        Ok(Self::new(bytes))
    }

    /// Raw credential bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(REDACTED)")
    }
}

/// Client for one family of key URIs
pub trait KmsClient: Send + Sync {
    /// Whether this client serves `key_uri`
    fn supports(&self, key_uri: &str) -> bool;

    /// AEAD backed by the key at `key_uri`
    fn get_aead(&self, key_uri: &str, credentials: Option<&Credentials>) -> Result<Arc<dyn Aead>>;
}

static GLOBAL: Lazy<KmsClients> = Lazy::new(KmsClients::new);

/// Ordered list of KMS clients
pub struct KmsClients {
    clients: ArcSwap<Vec<Arc<dyn KmsClient>>>,
    writer: Mutex<()>,
}

impl KmsClients {
    /// Empty client list
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(()),
        }
    }

    /// The process-wide client list
    pub fn global() -> &'static KmsClients {
        &GLOBAL
    }

    /// Append a client; earlier clients take precedence
    pub fn add(&self, client: Arc<dyn KmsClient>) {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::clone(&self.clients.load());
        next.push(client);
        let count = next.len();
        self.clients.store(Arc::new(next));
        tracing::debug!(clients = count, "registered KMS client");
    }

    /// First client supporting `key_uri`
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedKeyUri` (carrying a hash of the URI) if none does.
    pub fn get(&self, key_uri: &str) -> Result<Arc<dyn KmsClient>> {
        self.clients
            .load()
            .iter()
            .find(|client| client.supports(key_uri))
            .cloned()
            .ok_or_else(|| {
                KeysetError::UnsupportedKeyUri(LoggingTransformer::secure_hash_key(key_uri))
            })
    }

    /// Number of registered clients
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.load().len()
    }

    /// True when no client is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.load().is_empty()
    }
}

impl Default for KmsClients {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KmsClients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KmsClients")
            .field("clients", &self.len())
            .finish()
    }
}

/// A master key: the AEAD that protects encrypted keysets and the URI naming it
#[derive(Clone)]
pub struct MasterKey {
    key_uri: String,
    aead: Arc<dyn Aead>,
}

impl MasterKey {
    /// Name an AEAD as a master key
    #[must_use]
    pub fn new(key_uri: impl Into<String>, aead: Arc<dyn Aead>) -> Self {
        Self {
            key_uri: key_uri.into(),
            aead,
        }
    }

    /// Resolve a master key through the global KMS clients
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedKeyUri` or the client's error.
    pub fn from_kms(key_uri: &str, credentials: Option<&Credentials>) -> Result<Self> {
        Self::from_kms_with(KmsClients::global(), key_uri, credentials)
    }

    /// Resolve a master key through `clients`
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedKeyUri` or the client's error.
    pub fn from_kms_with(
        clients: &KmsClients,
        key_uri: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Self> {
        let aead = clients
            .get(key_uri)?
            .get_aead(key_uri, credentials)
            .inspect_err(|err| {
                LoggingTransformer::log_kms_operation("get_aead", key_uri, err.is_transient());
            })?;
        LoggingTransformer::log_kms_operation("get_aead", key_uri, false);
        Ok(Self::new(key_uri, aead))
    }

    /// URI recorded in encrypted keysets
    #[must_use]
    pub fn key_uri(&self) -> &str {
        &self.key_uri
    }

    /// The master AEAD
    #[must_use]
    pub fn aead(&self) -> &dyn Aead {
        self.aead.as_ref()
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey")
            .field("key_uri", &LoggingTransformer::secure_hash_key(&self.key_uri))
            .finish_non_exhaustive()
    }
}
