//! Capability token gating access to secret key material

/// Marker proving that the caller deliberately asked for secret key material.
///
/// The only way to obtain one is [`SecretKeyAccess::insecure`], so every place
/// that reads raw key bytes or serializes secret keys is a visible call site.
#[derive(Clone, Copy, Debug)]
pub struct SecretKeyAccess {
    _private: (),
}

impl SecretKeyAccess {
    /// Request access to secret key material
    #[must_use]
    pub fn insecure() -> Self {
        tracing::trace!("secret key access token issued");
        Self { _private: () }
    }
}
