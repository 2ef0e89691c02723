//! Minimal key handlers backed by dev-dependency crates, for unit tests

use crate::key_data::{KeyData, KeyMaterialKind, KeyTemplate};
use crate::output_prefix::OutputPrefixKind;
use crate::primitives::{Aead, Mac, Primitive, PrimitiveKind, Signer, Verifier};
use crate::registry::{KeyHandler, KeyRegistry};
use crate::{KeysetError, Result};
use aes_gcm::aead::{Aead as _, Payload};
use aes_gcm::{Aes128Gcm, KeyInit, Nonce};
use hmac::{Hmac, Mac as _};
use once_cell::sync::Lazy;
use rand::RngCore;
use sha2::Sha256;
use std::sync::Arc;

pub const TEST_AEAD_TYPE_URL: &str = "type.test/Aes128GcmKey";
pub const TEST_MAC_TYPE_URL: &str = "type.test/HmacSha256Key";
pub const TEST_SIGNER_TYPE_URL: &str = "type.test/MacSignerPrivateKey";
pub const TEST_VERIFIER_TYPE_URL: &str = "type.test/MacSignerPublicKey";

static REGISTRY: Lazy<KeyRegistry> = Lazy::new(|| {
    let registry = KeyRegistry::new();
    for result in [
        registry.register_handler(TestAeadHandler),
        registry.register_handler(TestMacHandler),
        registry.register_handler(TestSignerHandler),
        registry.register_handler(TestVerifierHandler),
    ] {
        result.unwrap();
    }
    registry
});

/// Shared registry with every test handler bound
pub fn registry() -> &'static KeyRegistry {
    &REGISTRY
}

pub fn aead_template() -> KeyTemplate {
    KeyTemplate::new(TEST_AEAD_TYPE_URL, serde_json::Value::Null, OutputPrefixKind::Tink)
}

pub fn mac_template() -> KeyTemplate {
    KeyTemplate::new(TEST_MAC_TYPE_URL, serde_json::Value::Null, OutputPrefixKind::Tink)
}

pub fn signer_template() -> KeyTemplate {
    KeyTemplate::new(TEST_SIGNER_TYPE_URL, serde_json::Value::Null, OutputPrefixKind::Tink)
}

pub fn aead_key() -> KeyData {
    registry().new_key_data(&aead_template()).unwrap()
}

pub fn mac_key() -> KeyData {
    registry().new_key_data(&mac_template()).unwrap()
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

fn check_len(key: &[u8], len: usize) -> Result<()> {
    if key.len() == len {
        Ok(())
    } else {
        Err(KeysetError::invalid_key(format!(
            "expected {len} key bytes, got {}",
            key.len()
        )))
    }
}

pub struct TestAeadHandler;

impl KeyHandler for TestAeadHandler {
    fn type_url(&self) -> &str {
        TEST_AEAD_TYPE_URL
    }
    fn material_kind(&self) -> KeyMaterialKind {
        KeyMaterialKind::Symmetric
    }
    fn supported_primitives(&self) -> &[PrimitiveKind] {
        &[PrimitiveKind::Aead]
    }
    fn validate_params(&self, _params: &serde_json::Value) -> Result<()> {
        Ok(())
    }
    fn validate_key(&self, key: &[u8]) -> Result<()> {
        check_len(key, 16)
    }
    fn generate(&self, _params: &serde_json::Value) -> Result<Vec<u8>> {
        Ok(random_bytes(16))
    }
    fn primitive(&self, _kind: PrimitiveKind, key: &[u8]) -> Result<Primitive> {
        let cipher = Aes128Gcm::new_from_slice(key)
            .map_err(|_| KeysetError::invalid_key("bad aes key length"))?;
        Ok(Primitive::Aead(Arc::new(TestAead(cipher))))
    }
}

struct TestAead(Aes128Gcm);

impl Aead for TestAead {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        let nonce = random_bytes(12);
        let ciphertext = self
            .0
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|_| KeysetError::backend("aes-gcm encryption failed"))?;
        let mut out = nonce;
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < 12 {
            return Err(KeysetError::DecryptionFailed);
        }
        let (nonce, body) = ciphertext.split_at(12);
        self.0
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: body,
                    aad: associated_data,
                },
            )
            .map_err(|_| KeysetError::DecryptionFailed)
    }
}

pub struct TestMacHandler;

impl KeyHandler for TestMacHandler {
    fn type_url(&self) -> &str {
        TEST_MAC_TYPE_URL
    }
    fn material_kind(&self) -> KeyMaterialKind {
        KeyMaterialKind::Symmetric
    }
    fn supported_primitives(&self) -> &[PrimitiveKind] {
        &[PrimitiveKind::Mac]
    }
    fn validate_params(&self, _params: &serde_json::Value) -> Result<()> {
        Ok(())
    }
    fn validate_key(&self, key: &[u8]) -> Result<()> {
        check_len(key, 32)
    }
    fn generate(&self, _params: &serde_json::Value) -> Result<Vec<u8>> {
        Ok(random_bytes(32))
    }
    fn primitive(&self, _kind: PrimitiveKind, key: &[u8]) -> Result<Primitive> {
        Ok(Primitive::Mac(Arc::new(TestMac(key.to_vec()))))
    }
}

struct TestMac(Vec<u8>);

impl TestMac {
    fn tag(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut mac = <Hmac<Sha256> as hmac::Mac>::new_from_slice(&self.0)
            .map_err(|_| KeysetError::invalid_key("bad hmac key length"))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl Mac for TestMac {
    fn compute_mac(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.tag(data)
    }

    fn verify_mac(&self, tag: &[u8], data: &[u8]) -> Result<()> {
        let mut mac = <Hmac<Sha256> as hmac::Mac>::new_from_slice(&self.0)
            .map_err(|_| KeysetError::invalid_key("bad hmac key length"))?;
        mac.update(data);
        mac.verify_slice(tag)
            .map_err(|_| KeysetError::VerificationFailed)
    }
}

impl Signer for TestMac {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.tag(data)
    }
}

impl Verifier for TestMac {
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()> {
        self.verify_mac(signature, data)
    }
}

/// Signing key type whose "signatures" are HMAC tags; the public half shares the secret
pub struct TestSignerHandler;

impl KeyHandler for TestSignerHandler {
    fn type_url(&self) -> &str {
        TEST_SIGNER_TYPE_URL
    }
    fn material_kind(&self) -> KeyMaterialKind {
        KeyMaterialKind::AsymmetricPrivate
    }
    fn supported_primitives(&self) -> &[PrimitiveKind] {
        &[PrimitiveKind::Signer, PrimitiveKind::Verifier]
    }
    fn validate_params(&self, _params: &serde_json::Value) -> Result<()> {
        Ok(())
    }
    fn validate_key(&self, key: &[u8]) -> Result<()> {
        check_len(key, 32)
    }
    fn generate(&self, _params: &serde_json::Value) -> Result<Vec<u8>> {
        Ok(random_bytes(32))
    }
    fn primitive(&self, kind: PrimitiveKind, key: &[u8]) -> Result<Primitive> {
        let inner = Arc::new(TestMac(key.to_vec()));
        Ok(match kind {
            PrimitiveKind::Signer => Primitive::Signer(inner),
            _ => Primitive::Verifier(inner),
        })
    }
    fn public_key(&self, key: &[u8]) -> Result<KeyData> {
        Ok(KeyData::new(
            TEST_VERIFIER_TYPE_URL,
            key.to_vec(),
            KeyMaterialKind::AsymmetricPublic,
        ))
    }
}

pub struct TestVerifierHandler;

impl KeyHandler for TestVerifierHandler {
    fn type_url(&self) -> &str {
        TEST_VERIFIER_TYPE_URL
    }
    fn material_kind(&self) -> KeyMaterialKind {
        KeyMaterialKind::AsymmetricPublic
    }
    fn supported_primitives(&self) -> &[PrimitiveKind] {
        &[PrimitiveKind::Verifier]
    }
    fn validate_params(&self, _params: &serde_json::Value) -> Result<()> {
        Err(KeysetError::invalid_key("public keys cannot be generated"))
    }
    fn validate_key(&self, key: &[u8]) -> Result<()> {
        check_len(key, 32)
    }
    fn generate(&self, _params: &serde_json::Value) -> Result<Vec<u8>> {
        Err(KeysetError::invalid_key("public keys cannot be generated"))
    }
    fn primitive(&self, _kind: PrimitiveKind, key: &[u8]) -> Result<Primitive> {
        Ok(Primitive::Verifier(Arc::new(TestMac(key.to_vec()))))
    }
}
