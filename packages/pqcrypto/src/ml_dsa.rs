//! ML-DSA (FIPS 204) key types at the three standard security levels
//!
//! Private keys carry their public key so the public keyset can be derived
//! without re-running key generation.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tessera_key::{
    KeyData, KeyHandler, KeyMaterialKind, KeysetError, Primitive, PrimitiveKind, Result, Signer,
    Verifier, encoding,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

const KEY_VERSION: u32 = 0;
const PAIR_CHECK_MESSAGE: &[u8] = b"tessera ML-DSA key pair check";

#[derive(Serialize, Deserialize)]
struct MlDsaPublicKey {
    version: u32,
    public_key: Vec<u8>,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct MlDsaPrivateKey {
    version: u32,
    #[zeroize(skip)]
    public_key: Vec<u8>,
    secret_key: Vec<u8>,
}

fn check_version(version: u32) -> Result<()> {
    if version == KEY_VERSION {
        Ok(())
    } else {
        Err(KeysetError::invalid_key(format!("unsupported key version {version}")))
    }
}

fn check_len(what: &str, label: &str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(KeysetError::invalid_key(format!(
            "{label} {what} must be {expected} bytes, not {actual}"
        )))
    }
}

fn check_params(label: &str, params: &serde_json::Value) -> Result<()> {
    match params {
        serde_json::Value::Null => Ok(()),
        serde_json::Value::Object(map) if map.is_empty() => Ok(()),
        _ => Err(KeysetError::invalid_key(format!("{label} takes no parameters"))),
    }
}

fn unsupported(type_url: &str, kind: PrimitiveKind) -> KeysetError {
    KeysetError::UnsupportedPrimitive {
        type_url: type_url.to_string(),
        primitive: kind,
    }
}

macro_rules! ml_dsa_variant {
    (
        $module:ident,
        $private_handler:ident,
        $public_handler:ident,
        $private_url:ident = $private_url_value:literal,
        $public_url:ident = $public_url_value:literal,
        $label:literal
    ) => {
        #[doc = concat!("Type URL of ", $label, " private keys")]
        pub const $private_url: &str = $private_url_value;
        #[doc = concat!("Type URL of ", $label, " public keys")]
        pub const $public_url: &str = $public_url_value;

        mod $module {
            use super::*;
            use pqcrypto_mldsa::$module as scheme;
            use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};

            /// Decode a private key and check that its halves form one key pair
            pub(super) fn decode_private(bytes: &[u8]) -> Result<MlDsaPrivateKey> {
                let key: MlDsaPrivateKey = encoding::decode(bytes)?;
                check_version(key.version)?;
                check_len("public key", $label, key.public_key.len(), scheme::public_key_bytes())?;
                check_len("secret key", $label, key.secret_key.len(), scheme::secret_key_bytes())?;
                let signer = signer(&key)?;
                let verifier = verifier(&MlDsaPublicKey {
                    version: KEY_VERSION,
                    public_key: key.public_key.clone(),
                })?;
                let signature = signer.sign(PAIR_CHECK_MESSAGE)?;
                verifier.verify(&signature, PAIR_CHECK_MESSAGE).map_err(|_| {
                    KeysetError::invalid_key(concat!(
                        $label,
                        " public key does not match the secret key"
                    ))
                })?;
                Ok(key)
            }

            pub(super) fn decode_public(bytes: &[u8]) -> Result<MlDsaPublicKey> {
                let key: MlDsaPublicKey = encoding::decode(bytes)?;
                check_version(key.version)?;
                check_len("public key", $label, key.public_key.len(), scheme::public_key_bytes())?;
                Ok(key)
            }

            pub(super) fn generate() -> Result<Vec<u8>> {
                let (pk, sk) = scheme::keypair();
                encoding::encode(&MlDsaPrivateKey {
                    version: KEY_VERSION,
                    public_key: pk.as_bytes().to_vec(),
                    secret_key: sk.as_bytes().to_vec(),
                })
            }

            pub(super) struct MlDsaSigner(scheme::SecretKey);

            impl Signer for MlDsaSigner {
                fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
                    Ok(scheme::detached_sign(data, &self.0).as_bytes().to_vec())
                }
            }

            pub(super) struct MlDsaVerifier(scheme::PublicKey);

            impl Verifier for MlDsaVerifier {
                fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()> {
                    if signature.len() != scheme::signature_bytes() {
                        return Err(KeysetError::VerificationFailed);
                    }
                    let signature = scheme::DetachedSignature::from_bytes(signature)
                        .map_err(|_| KeysetError::VerificationFailed)?;
                    scheme::verify_detached_signature(&signature, data, &self.0)
                        .map_err(|_| KeysetError::VerificationFailed)
                }
            }

            pub(super) fn signer(key: &MlDsaPrivateKey) -> Result<MlDsaSigner> {
                scheme::SecretKey::from_bytes(&key.secret_key)
                    .map(MlDsaSigner)
                    .map_err(|_| KeysetError::invalid_key(concat!($label, " secret key rejected")))
            }

            pub(super) fn verifier(key: &MlDsaPublicKey) -> Result<MlDsaVerifier> {
                scheme::PublicKey::from_bytes(&key.public_key)
                    .map(MlDsaVerifier)
                    .map_err(|_| KeysetError::invalid_key(concat!($label, " public key rejected")))
            }
        }

        #[doc = concat!($label, " private keys")]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $private_handler;

        impl KeyHandler for $private_handler {
            fn type_url(&self) -> &str {
                $private_url
            }

            fn material_kind(&self) -> KeyMaterialKind {
                KeyMaterialKind::AsymmetricPrivate
            }

            fn supported_primitives(&self) -> &[PrimitiveKind] {
                &[PrimitiveKind::Signer, PrimitiveKind::Verifier]
            }

            fn validate_params(&self, params: &serde_json::Value) -> Result<()> {
                check_params($label, params)
            }

            fn validate_key(&self, key: &[u8]) -> Result<()> {
                $module::decode_private(key).map(drop)
            }

            fn generate(&self, params: &serde_json::Value) -> Result<Vec<u8>> {
                check_params($label, params)?;
                $module::generate()
            }

            fn primitive(&self, kind: PrimitiveKind, key: &[u8]) -> Result<Primitive> {
                let key = $module::decode_private(key)?;
                match kind {
                    PrimitiveKind::Signer => Ok(Primitive::Signer(Arc::new($module::signer(&key)?))),
                    PrimitiveKind::Verifier => {
                        let public = MlDsaPublicKey {
                            version: KEY_VERSION,
                            public_key: key.public_key.clone(),
                        };
                        Ok(Primitive::Verifier(Arc::new($module::verifier(&public)?)))
                    }
                    _ => Err(unsupported($private_url, kind)),
                }
            }

            fn public_key(&self, key: &[u8]) -> Result<KeyData> {
                let key = $module::decode_private(key)?;
                let public = MlDsaPublicKey {
                    version: KEY_VERSION,
                    public_key: key.public_key.clone(),
                };
                Ok(KeyData::new(
                    $public_url,
                    encoding::encode(&public)?,
                    KeyMaterialKind::AsymmetricPublic,
                ))
            }
        }

        #[doc = concat!($label, " public keys, derived from private keys")]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $public_handler;

        impl KeyHandler for $public_handler {
            fn type_url(&self) -> &str {
                $public_url
            }

            fn material_kind(&self) -> KeyMaterialKind {
                KeyMaterialKind::AsymmetricPublic
            }

            fn supported_primitives(&self) -> &[PrimitiveKind] {
                &[PrimitiveKind::Verifier]
            }

            fn validate_params(&self, _params: &serde_json::Value) -> Result<()> {
                Err(KeysetError::invalid_key(concat!(
                    $label,
                    " public keys are derived from private keys, not generated"
                )))
            }

            fn validate_key(&self, key: &[u8]) -> Result<()> {
                $module::decode_public(key).map(drop)
            }

            fn generate(&self, params: &serde_json::Value) -> Result<Vec<u8>> {
                self.validate_params(params)?;
                Ok(Vec::new())
            }

            fn primitive(&self, kind: PrimitiveKind, key: &[u8]) -> Result<Primitive> {
                if kind != PrimitiveKind::Verifier {
                    return Err(unsupported($public_url, kind));
                }
                let key = $module::decode_public(key)?;
                Ok(Primitive::Verifier(Arc::new($module::verifier(&key)?)))
            }
        }
    };
}

ml_dsa_variant!(
    mldsa44,
    MlDsa44PrivateKeyHandler,
    MlDsa44PublicKeyHandler,
    ML_DSA_44_PRIVATE_TYPE_URL = "type.tessera.dev/tessera.MlDsa44PrivateKey",
    ML_DSA_44_PUBLIC_TYPE_URL = "type.tessera.dev/tessera.MlDsa44PublicKey",
    "ML-DSA-44"
);

ml_dsa_variant!(
    mldsa65,
    MlDsa65PrivateKeyHandler,
    MlDsa65PublicKeyHandler,
    ML_DSA_65_PRIVATE_TYPE_URL = "type.tessera.dev/tessera.MlDsa65PrivateKey",
    ML_DSA_65_PUBLIC_TYPE_URL = "type.tessera.dev/tessera.MlDsa65PublicKey",
    "ML-DSA-65"
);

ml_dsa_variant!(
    mldsa87,
    MlDsa87PrivateKeyHandler,
    MlDsa87PublicKeyHandler,
    ML_DSA_87_PRIVATE_TYPE_URL = "type.tessera.dev/tessera.MlDsa87PrivateKey",
    ML_DSA_87_PUBLIC_TYPE_URL = "type.tessera.dev/tessera.MlDsa87PublicKey",
    "ML-DSA-87"
);
