use super::{WrappedPrimitive, log_backend_failure};
use crate::bundle::PrimitiveBundle;
use crate::keyset::Keyset;
use crate::primitives::{Mac, Primitive, PrimitiveKind};
use crate::registry::KeyRegistry;
use crate::{KeysetError, Result};

/// MAC over every enabled key of a keyset
pub struct WrappedMac {
    bundle: PrimitiveBundle<dyn Mac>,
}

impl WrappedMac {
    /// Id of the key used for computing tags
    #[must_use]
    pub fn primary_key_id(&self) -> Option<u32> {
        super::primary_key_id(&self.bundle)
    }
}

impl WrappedPrimitive for WrappedMac {
    const KIND: PrimitiveKind = PrimitiveKind::Mac;

    fn from_keyset(keyset: &Keyset, registry: &KeyRegistry) -> Result<Self> {
        let bundle = PrimitiveBundle::build(keyset, registry, Self::KIND, Primitive::into_mac)?;
        Ok(Self { bundle })
    }
}

impl Mac for WrappedMac {
    fn compute_mac(&self, data: &[u8]) -> Result<Vec<u8>> {
        let primary = self.bundle.primary()?;
        let input = primary.output_prefix_kind.framed_input(data);
        let tag = primary
            .primitive
            .compute_mac(&input)
            .map_err(|e| log_backend_failure("compute_mac", e))?;
        Ok(primary.prefix.frame(&tag))
    }

    fn verify_mac(&self, tag: &[u8], data: &[u8]) -> Result<()> {
        self.bundle
            .consume(tag, |entry, payload| {
                let input = entry.output_prefix_kind.framed_input(data);
                entry.primitive.verify_mac(payload, &input)
            })
            .ok_or(KeysetError::VerificationFailed)
    }
}
