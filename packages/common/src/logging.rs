//! Structured logging infrastructure
//!
//! Provides env_logger-based logging with secure handling of sensitive data.
//! Library crates emit `tracing` events built with the `log` feature, so the
//! logger installed here receives them as well.

use log::{debug, error, info, warn};
use sha2::{Digest, Sha256};
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Logging bootstrap and key-safe log helpers
pub struct LoggingTransformer;

impl LoggingTransformer {
    /// Initialize logging (call once at application startup)
    ///
    /// Configure levels via the `RUST_LOG` environment variable:
    /// - `RUST_LOG=debug` - all debug logs
    /// - `RUST_LOG=info` - info and above
    /// - `RUST_LOG=tessera_key=trace` - module-specific levels
    pub fn init() {
        INIT_LOGGER.call_once(|| {
            env_logger::Builder::from_default_env()
                .format_timestamp_micros()
                .init();

            info!("Structured logging initialized");
        });
    }

    /// Initialize logging for test environments
    ///
    /// Safe to call from every test; later calls are ignored.
    pub fn init_test() {
        let _ = env_logger::Builder::from_default_env()
            .is_test(true)
            .try_init();
    }

    /// Log a keyset lifecycle operation
    ///
    /// The keyset reference is hashed, since it may embed key material
    /// (as `local-kms://` URIs do).
    pub fn log_keyset_operation(operation: &str, keyset_ref: &str, success: bool) {
        let ref_hash = Self::secure_hash_key(keyset_ref);
        if success {
            debug!("Keyset operation succeeded: {operation} (ref_hash: {ref_hash})");
        } else {
            warn!("Keyset operation failed: {operation} (ref_hash: {ref_hash})");
        }
    }

    /// Log a KMS interaction without revealing the key URI
    pub fn log_kms_operation(operation: &str, key_uri: &str, transient: bool) {
        let uri_hash = Self::secure_hash_key(key_uri);
        if transient {
            warn!("KMS operation hit a transient failure: {operation} (uri_hash: {uri_hash})");
        } else {
            debug!("KMS operation: {operation} (uri_hash: {uri_hash})");
        }
    }

    /// Secure logging of cryptographic errors
    ///
    /// Logs the error type without exposing its contents.
    pub fn log_crypto_error(operation: &str, error: &dyn std::error::Error) {
        error!(
            "Cryptographic operation failed: {} (error_type: {})",
            operation,
            std::any::type_name_of_val(error)
        );
    }

    /// SHA-256 based identifier for logging
    ///
    /// Returns `#` followed by the first 12 hex characters of the digest.
    #[must_use]
    pub fn secure_hash_key(key: &str) -> String {
        let hash = Sha256::digest(key.as_bytes());
        let hex_hash = format!("{hash:x}");
        format!("#{}", &hex_hash[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_key_hashing() {
        LoggingTransformer::init_test();

        let hash1 = LoggingTransformer::secure_hash_key("local-kms://AAAA");
        let hash2 = LoggingTransformer::secure_hash_key("local-kms://BBBB");
        assert_ne!(hash1, hash2);
        assert_eq!(hash1, LoggingTransformer::secure_hash_key("local-kms://AAAA"));

        assert!(hash1.starts_with('#'));
        assert_eq!(hash1.len(), 13);
        assert!(!hash1.contains("AAAA"));
    }

    #[test]
    fn test_logging_operations() {
        LoggingTransformer::init_test();

        LoggingTransformer::log_keyset_operation("parse_encrypted", "local-kms://key", true);
        LoggingTransformer::log_keyset_operation("parse_encrypted", "local-kms://key", false);
        LoggingTransformer::log_kms_operation("get_aead", "local-kms://key", true);
        LoggingTransformer::log_crypto_error("decrypt", &std::io::Error::other("boom"));
    }
}
