use super::{WrappedPrimitive, log_backend_failure};
use crate::bundle::PrimitiveBundle;
use crate::keyset::Keyset;
use crate::primitives::{Primitive, PrimitiveKind, Signer, Verifier};
use crate::registry::KeyRegistry;
use crate::{KeysetError, Result};

/// Signer using the primary key of a private keyset
pub struct WrappedSigner {
    bundle: PrimitiveBundle<dyn Signer>,
}

impl WrappedSigner {
    /// Id of the signing key
    #[must_use]
    pub fn primary_key_id(&self) -> Option<u32> {
        super::primary_key_id(&self.bundle)
    }
}

impl WrappedPrimitive for WrappedSigner {
    const KIND: PrimitiveKind = PrimitiveKind::Signer;

    fn from_keyset(keyset: &Keyset, registry: &KeyRegistry) -> Result<Self> {
        let bundle = PrimitiveBundle::build(keyset, registry, Self::KIND, Primitive::into_signer)?;
        Ok(Self { bundle })
    }
}

impl Signer for WrappedSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let primary = self.bundle.primary()?;
        let input = primary.output_prefix_kind.framed_input(data);
        let signature = primary
            .primitive
            .sign(&input)
            .map_err(|e| log_backend_failure("sign", e))?;
        Ok(primary.prefix.frame(&signature))
    }
}

/// Verifier over every enabled key of a private or public keyset
pub struct WrappedVerifier {
    bundle: PrimitiveBundle<dyn Verifier>,
}

impl WrappedPrimitive for WrappedVerifier {
    const KIND: PrimitiveKind = PrimitiveKind::Verifier;

    fn from_keyset(keyset: &Keyset, registry: &KeyRegistry) -> Result<Self> {
        let bundle =
            PrimitiveBundle::build(keyset, registry, Self::KIND, Primitive::into_verifier)?;
        Ok(Self { bundle })
    }
}

impl Verifier for WrappedVerifier {
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<()> {
        self.bundle
            .consume(signature, |entry, payload| {
                let input = entry.output_prefix_kind.framed_input(data);
                entry.primitive.verify(payload, &input)
            })
            .ok_or(KeysetError::VerificationFailed)
    }
}
