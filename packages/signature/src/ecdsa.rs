//! ECDSA over P-256 with SHA-256
//!
//! Private keys store the scalar next to their public point; the point is
//! rederived and compared whenever a private key is validated.

use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tessera_key::{
    KeyData, KeyHandler, KeyMaterialKind, KeysetError, Primitive, PrimitiveKind, Result, Signer,
    Verifier, encoding,
};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Type URL of ECDSA P-256 private keys
pub const ECDSA_PRIVATE_TYPE_URL: &str = "type.tessera.dev/tessera.EcdsaPrivateKey";
/// Type URL of ECDSA P-256 public keys
pub const ECDSA_PUBLIC_TYPE_URL: &str = "type.tessera.dev/tessera.EcdsaPublicKey";

const KEY_VERSION: u32 = 0;
const SCALAR_SIZE: usize = 32;
const UNCOMPRESSED_POINT_SIZE: usize = 65;
const MAX_GENERATION_ATTEMPTS: usize = 16;

/// Wire encoding of signatures
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureEncoding {
    /// ASN.1 DER `SEQUENCE { r, s }`, variable length
    #[default]
    #[serde(rename = "DER")]
    Der,
    /// Fixed 64-byte `r || s`
    #[serde(rename = "IEEE_P1363")]
    IeeeP1363,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EcdsaParams {
    #[serde(default)]
    encoding: SignatureEncoding,
}

impl EcdsaParams {
    fn parse(params: &serde_json::Value) -> Result<Self> {
        if params.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(params)
            .map_err(|e| KeysetError::invalid_key(format!("invalid ECDSA parameters: {e}")))
    }
}

#[derive(Serialize, Deserialize)]
struct EcdsaPublicKey {
    version: u32,
    encoding: SignatureEncoding,
    point: Vec<u8>,
}

impl EcdsaPublicKey {
    fn decode(bytes: &[u8]) -> Result<(Self, VerifyingKey)> {
        let key: Self = encoding::decode(bytes)?;
        check_version(key.version)?;
        if key.point.len() != UNCOMPRESSED_POINT_SIZE {
            return Err(KeysetError::invalid_key("ECDSA public point must be uncompressed"));
        }
        let verifying_key = VerifyingKey::from_sec1_bytes(&key.point)
            .map_err(|_| KeysetError::invalid_key("ECDSA public point is not on P-256"))?;
        Ok((key, verifying_key))
    }
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct EcdsaPrivateKey {
    version: u32,
    #[zeroize(skip)]
    public_key: EcdsaPublicKey,
    key_value: Vec<u8>,
}

impl EcdsaPrivateKey {
    fn decode(bytes: &[u8]) -> Result<(Self, SigningKey)> {
        let key: Self = encoding::decode(bytes)?;
        check_version(key.version)?;
        check_version(key.public_key.version)?;
        let scalar: [u8; SCALAR_SIZE] = key
            .key_value
            .as_slice()
            .try_into()
            .map_err(|_| KeysetError::invalid_key("ECDSA private scalar must be 32 bytes"))?;
        let scalar = Zeroizing::new(scalar);
        let signing_key = SigningKey::from_bytes(&(*scalar).into())
            .map_err(|_| KeysetError::invalid_key("ECDSA private scalar out of range"))?;
        if uncompressed_point(signing_key.verifying_key()) != key.public_key.point {
            return Err(KeysetError::invalid_key(
                "ECDSA public point does not match the private scalar",
            ));
        }
        Ok((key, signing_key))
    }
}

fn check_version(version: u32) -> Result<()> {
    if version == KEY_VERSION {
        Ok(())
    } else {
        Err(KeysetError::invalid_key(format!("unsupported key version {version}")))
    }
}

fn uncompressed_point(key: &VerifyingKey) -> Vec<u8> {
    key.to_encoded_point(false).as_bytes().to_vec()
}

fn random_signing_key() -> Result<SigningKey> {
    let mut scalar = Zeroizing::new([0u8; SCALAR_SIZE]);
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        rand::rng().fill_bytes(&mut scalar[..]);
        if let Ok(key) = SigningKey::from_bytes(&(*scalar).into()) {
            return Ok(key);
        }
    }
    Err(KeysetError::backend("could not sample a P-256 scalar"))
}

struct EcdsaSigner {
    key: SigningKey,
    encoding: SignatureEncoding,
}

impl Signer for EcdsaSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signature: Signature = self
            .key
            .try_sign(data)
            .map_err(|e| KeysetError::backend(e.to_string()))?;
        Ok(match self.encoding {
            SignatureEncoding::Der => signature.to_der().as_bytes().to_vec(),
            SignatureEncoding::IeeeP1363 => signature.to_bytes().to_vec(),
        })
    }
}

struct EcdsaVerifier {
    key: VerifyingKey,
    encoding: SignatureEncoding,
}

impl Verifier for EcdsaVerifier {
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()> {
        let signature = match self.encoding {
            SignatureEncoding::Der => Signature::from_der(signature),
            SignatureEncoding::IeeeP1363 => Signature::from_slice(signature),
        }
        .map_err(|_| KeysetError::VerificationFailed)?;
        self.key
            .verify(data, &signature)
            .map_err(|_| KeysetError::VerificationFailed)
    }
}

fn unsupported(type_url: &str, kind: PrimitiveKind) -> KeysetError {
    KeysetError::UnsupportedPrimitive {
        type_url: type_url.to_string(),
        primitive: kind,
    }
}

fn not_generated() -> KeysetError {
    KeysetError::invalid_key("ECDSA public keys are derived from private keys, not generated")
}

/// ECDSA P-256 private keys
///
/// Template parameters: `{"encoding": "DER"}` or `{"encoding": "IEEE_P1363"}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EcdsaPrivateKeyHandler;

impl KeyHandler for EcdsaPrivateKeyHandler {
    fn type_url(&self) -> &str {
        ECDSA_PRIVATE_TYPE_URL
    }

    fn material_kind(&self) -> KeyMaterialKind {
        KeyMaterialKind::AsymmetricPrivate
    }

    fn supported_primitives(&self) -> &[PrimitiveKind] {
        &[PrimitiveKind::Signer, PrimitiveKind::Verifier]
    }

    fn validate_params(&self, params: &serde_json::Value) -> Result<()> {
        EcdsaParams::parse(params).map(drop)
    }

    fn validate_key(&self, key: &[u8]) -> Result<()> {
        EcdsaPrivateKey::decode(key).map(drop)
    }

    fn generate(&self, params: &serde_json::Value) -> Result<Vec<u8>> {
        let params = EcdsaParams::parse(params)?;
        let signing_key = random_signing_key()?;
        encoding::encode(&EcdsaPrivateKey {
            version: KEY_VERSION,
            public_key: EcdsaPublicKey {
                version: KEY_VERSION,
                encoding: params.encoding,
                point: uncompressed_point(signing_key.verifying_key()),
            },
            key_value: signing_key.to_bytes().to_vec(),
        })
    }

    fn primitive(&self, kind: PrimitiveKind, key: &[u8]) -> Result<Primitive> {
        let (key, signing_key) = EcdsaPrivateKey::decode(key)?;
        let encoding = key.public_key.encoding;
        match kind {
            PrimitiveKind::Signer => Ok(Primitive::Signer(Arc::new(EcdsaSigner {
                key: signing_key,
                encoding,
            }))),
            PrimitiveKind::Verifier => Ok(Primitive::Verifier(Arc::new(EcdsaVerifier {
                key: VerifyingKey::from(&signing_key),
                encoding,
            }))),
            _ => Err(unsupported(ECDSA_PRIVATE_TYPE_URL, kind)),
        }
    }

    fn public_key(&self, key: &[u8]) -> Result<KeyData> {
        let (key, _) = EcdsaPrivateKey::decode(key)?;
        Ok(KeyData::new(
            ECDSA_PUBLIC_TYPE_URL,
            encoding::encode(&key.public_key)?,
            KeyMaterialKind::AsymmetricPublic,
        ))
    }
}

/// ECDSA P-256 public keys, derived from private keys
#[derive(Debug, Default, Clone, Copy)]
pub struct EcdsaPublicKeyHandler;

impl KeyHandler for EcdsaPublicKeyHandler {
    fn type_url(&self) -> &str {
        ECDSA_PUBLIC_TYPE_URL
    }

    fn material_kind(&self) -> KeyMaterialKind {
        KeyMaterialKind::AsymmetricPublic
    }

    fn supported_primitives(&self) -> &[PrimitiveKind] {
        &[PrimitiveKind::Verifier]
    }

    fn validate_params(&self, _params: &serde_json::Value) -> Result<()> {
        Err(not_generated())
    }

    fn validate_key(&self, key: &[u8]) -> Result<()> {
        EcdsaPublicKey::decode(key).map(drop)
    }

    fn generate(&self, _params: &serde_json::Value) -> Result<Vec<u8>> {
        Err(not_generated())
    }

    fn primitive(&self, kind: PrimitiveKind, key: &[u8]) -> Result<Primitive> {
        if kind != PrimitiveKind::Verifier {
            return Err(unsupported(ECDSA_PUBLIC_TYPE_URL, kind));
        }
        let (key, verifying_key) = EcdsaPublicKey::decode(key)?;
        Ok(Primitive::Verifier(Arc::new(EcdsaVerifier {
            key: verifying_key,
            encoding: key.encoding,
        })))
    }
}
