//! Process-wide registry mapping key type URLs to key handlers
//!
//! Lookups read an immutable snapshot through [`ArcSwap`] and never block.
//! Registrations are serialized by a writer lock and publish a new snapshot.

use crate::access::SecretKeyAccess;
use crate::key_data::{KeyData, KeyMaterialKind, KeyTemplate};
use crate::primitives::{Primitive, PrimitiveKind};
use crate::{KeysetError, Result};
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Validation, generation and primitive instantiation for one key type
pub trait KeyHandler: Send + Sync {
    /// Stable type URL identifying the key type
    fn type_url(&self) -> &str;

    /// Kind of material this handler's keys hold
    fn material_kind(&self) -> KeyMaterialKind;

    /// Primitive capabilities this key type can produce
    fn supported_primitives(&self) -> &[PrimitiveKind];

    /// Check template parameters before generating
    fn validate_params(&self, params: &serde_json::Value) -> Result<()>;

    /// Check encoded key material
    fn validate_key(&self, key: &[u8]) -> Result<()>;

    /// Generate fresh encoded key material from template parameters
    fn generate(&self, params: &serde_json::Value) -> Result<Vec<u8>>;

    /// Instantiate a primitive from validated key material
    fn primitive(&self, kind: PrimitiveKind, key: &[u8]) -> Result<Primitive>;

    /// Derive the public key data for a private key
    fn public_key(&self, _key: &[u8]) -> Result<KeyData> {
        Err(KeysetError::invalid_key(format!(
            "{} keys have no public counterpart",
            self.type_url()
        )))
    }

    /// Identity used to tell redundant registrations from conflicting ones
    ///
    /// Defaults to the Rust type name, so two values of one handler type count
    /// as the same handler even when they carry different configuration (for
    /// example `KmsEnvelopeKeyHandler`s bound to different registries or KMS
    /// client lists). The first registration wins; override this to tell such
    /// values apart.
    fn handler_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

type HandlerMap = HashMap<String, Arc<dyn KeyHandler>>;

static GLOBAL: Lazy<KeyRegistry> = Lazy::new(KeyRegistry::new);

/// Registry of key handlers
pub struct KeyRegistry {
    handlers: ArcSwap<HandlerMap>,
    writer: Mutex<()>,
}

impl KeyRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: ArcSwap::from_pointee(HashMap::new()),
            writer: Mutex::new(()),
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static KeyRegistry {
        &GLOBAL
    }

    /// Bind a handler to its type URL
    ///
    /// Registering the same handler type again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if a different handler owns the type URL.
    pub fn register(&self, handler: Arc<dyn KeyHandler>) -> Result<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.handlers.load_full();
        let type_url = handler.type_url().to_string();

        if let Some(existing) = current.get(&type_url) {
            if existing.handler_name() == handler.handler_name() {
                tracing::trace!(type_url = %type_url, "key handler already registered");
                return Ok(());
            }
            tracing::warn!(
                type_url = %type_url,
                existing = existing.handler_name(),
                rejected = handler.handler_name(),
                "conflicting key handler registration"
            );
            return Err(KeysetError::AlreadyRegistered(type_url));
        }

        let mut next = HandlerMap::clone(&current);
        next.insert(type_url.clone(), handler);
        self.handlers.store(Arc::new(next));
        tracing::debug!(type_url = %type_url, "registered key handler");
        Ok(())
    }

    /// Register a handler by value
    ///
    /// # Errors
    ///
    /// See [`KeyRegistry::register`].
    pub fn register_handler<H: KeyHandler + 'static>(&self, handler: H) -> Result<()> {
        self.register(Arc::new(handler))
    }

    /// Find the handler for a type URL
    ///
    /// # Errors
    ///
    /// Returns `UnknownKeyType` if nothing is registered for it.
    pub fn lookup(&self, type_url: &str) -> Result<Arc<dyn KeyHandler>> {
        self.handlers
            .load()
            .get(type_url)
            .cloned()
            .ok_or_else(|| KeysetError::UnknownKeyType(type_url.to_string()))
    }

    /// Whether a handler is bound to the type URL
    #[must_use]
    pub fn is_registered(&self, type_url: &str) -> bool {
        self.handlers.load().contains_key(type_url)
    }

    /// Generate new key material from a template
    ///
    /// # Errors
    ///
    /// Returns `UnknownKeyType` for an unregistered type, or the handler's
    /// parameter validation or generation error.
    pub fn new_key_data(&self, template: &KeyTemplate) -> Result<KeyData> {
        let handler = self.lookup(&template.type_url)?;
        handler.validate_params(&template.params)?;
        let value = handler.generate(&template.params)?;
        handler.validate_key(&value)?;
        Ok(KeyData::new(
            handler.type_url(),
            value,
            handler.material_kind(),
        ))
    }

    /// Handler for key data whose declared material kind matches the handler's
    ///
    /// # Errors
    ///
    /// Returns `UnknownKeyType` for an unregistered type, or `InvalidKey` if
    /// the key data claims a different material kind than its handler holds.
    pub fn handler_for(&self, key_data: &KeyData) -> Result<Arc<dyn KeyHandler>> {
        let handler = self.lookup(key_data.type_url())?;
        let expected = handler.material_kind();
        if key_data.material_kind() != expected {
            return Err(KeysetError::invalid_key(format!(
                "{} holds {expected:?} material, not {:?}",
                key_data.type_url(),
                key_data.material_kind()
            )));
        }
        Ok(handler)
    }

    /// Check that key data is non-secret by its key type, not only by its label
    ///
    /// # Errors
    ///
    /// Returns `SecretKeyAccessDenied` if the handler holds secret material,
    /// `UnknownKeyType` for an unregistered type, or `InvalidKey` for a
    /// mislabeled material kind.
    pub fn check_non_secret(&self, key_data: &KeyData) -> Result<()> {
        let handler = self.lookup(key_data.type_url())?;
        if handler.material_kind().is_secret() {
            return Err(KeysetError::SecretKeyAccessDenied);
        }
        self.handler_for(key_data).map(drop)
    }

    /// Instantiate a primitive of the requested capability from key data
    ///
    /// # Errors
    ///
    /// Returns `UnknownKeyType`, `InvalidKey` for a mislabeled material kind,
    /// `UnsupportedPrimitive`, or the handler's validation error.
    pub fn primitive(&self, key_data: &KeyData, kind: PrimitiveKind) -> Result<Primitive> {
        let handler = self.handler_for(key_data)?;
        let unsupported = || KeysetError::UnsupportedPrimitive {
            type_url: key_data.type_url().to_string(),
            primitive: kind,
        };
        if !handler.supported_primitives().contains(&kind) {
            return Err(unsupported());
        }
        let key = key_data.value(SecretKeyAccess::insecure());
        handler.validate_key(key)?;
        let primitive = handler.primitive(kind, key)?;
        if primitive.kind() != kind {
            return Err(unsupported());
        }
        Ok(primitive)
    }

    /// Public key data for private key data
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the key type has no public counterpart.
    pub fn public_key_data(&self, key_data: &KeyData) -> Result<KeyData> {
        let handler = self.handler_for(key_data)?;
        if key_data.material_kind() != KeyMaterialKind::AsymmetricPrivate {
            return Err(KeysetError::invalid_key(format!(
                "{} is not a private key",
                key_data.type_url()
            )));
        }
        let key = key_data.value(SecretKeyAccess::insecure());
        handler.validate_key(key)?;
        handler.public_key(key)
    }
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.load();
        let mut urls: Vec<&String> = handlers.keys().collect();
        urls.sort();
        f.debug_struct("KeyRegistry").field("handlers", &urls).finish()
    }
}
