//! Signing keysets and their public counterparts

use once_cell::sync::Lazy;
use proptest::prelude::*;
use tessera_key::{
    KeyRegistry, KeysetError, KeysetHandle, OutputPrefixKind, Signer, Verifier, WrappedSigner,
    WrappedVerifier,
};
use tessera_signature::{ecdsa_p256, ecdsa_p256_ieee_p1363, ecdsa_p256_raw};

static REGISTRY: Lazy<KeyRegistry> = Lazy::new(|| {
    let registry = KeyRegistry::new();
    tessera_signature::register_with(&registry).unwrap();
    registry
});

fn signer(handle: &KeysetHandle) -> WrappedSigner {
    handle.primitive_with(&REGISTRY).unwrap()
}

fn verifier(handle: &KeysetHandle) -> WrappedVerifier {
    handle
        .public_keyset_handle_with(&REGISTRY)
        .unwrap()
        .primitive_with(&REGISTRY)
        .unwrap()
}

#[test]
fn public_keyset_verifies_primary_signatures() {
    let handle = KeysetHandle::generate_new_with(&REGISTRY, &ecdsa_p256()).unwrap();
    let sig = signer(&handle).sign(b"release-1.0.tar.gz").unwrap();
    verifier(&handle).verify(&sig, b"release-1.0.tar.gz").unwrap();
    assert!(matches!(
        verifier(&handle).verify(&sig, b"release-1.1.tar.gz"),
        Err(KeysetError::VerificationFailed)
    ));
}

#[test]
fn public_keyset_cannot_sign() {
    let handle = KeysetHandle::generate_new_with(&REGISTRY, &ecdsa_p256()).unwrap();
    let public = handle.public_keyset_handle_with(&REGISTRY).unwrap();
    assert!(!public.keyset().has_secret_material());
    assert!(matches!(
        public.primitive_with::<WrappedSigner>(&REGISTRY),
        Err(KeysetError::UnsupportedPrimitive { .. })
    ));
}

#[test]
fn rotation_across_prefixes_and_encodings() {
    let handle = KeysetHandle::generate_new_with(&REGISTRY, &ecdsa_p256()).unwrap();
    let old = signer(&handle).sign(b"doc").unwrap();

    let legacy = handle
        .add_new_key_with(
            &REGISTRY,
            &ecdsa_p256_ieee_p1363().with_output_prefix(OutputPrefixKind::Legacy),
        )
        .unwrap();
    handle.set_primary(legacy).unwrap();
    let mid = signer(&handle).sign(b"doc").unwrap();
    assert_eq!(mid.len(), 5 + 64);

    let raw = handle.add_new_key_with(&REGISTRY, &ecdsa_p256_raw()).unwrap();
    handle.set_primary(raw).unwrap();
    let new = signer(&handle).sign(b"doc").unwrap();
    assert_eq!(new.len(), 64);

    let verify = verifier(&handle);
    for sig in [&old, &mid, &new] {
        verify.verify(sig, b"doc").unwrap();
    }
}

#[test]
fn destroyed_signing_keys_stop_verifying() {
    let handle = KeysetHandle::generate_new_with(&REGISTRY, &ecdsa_p256()).unwrap();
    let first = handle.primary_key_id().unwrap();
    let sig = signer(&handle).sign(b"doc").unwrap();
    let next = handle.add_new_key_with(&REGISTRY, &ecdsa_p256()).unwrap();
    handle.set_primary(next).unwrap();
    handle.destroy(first).unwrap();
    assert!(verifier(&handle).verify(&sig, b"doc").is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn signatures_verify_only_their_message(
        data in prop::collection::vec(any::<u8>(), 0..256),
        flip in any::<prop::sample::Index>(),
        p1363 in any::<bool>(),
    ) {
        let template = if p1363 { ecdsa_p256_ieee_p1363() } else { ecdsa_p256() };
        let handle = KeysetHandle::generate_new_with(&REGISTRY, &template).unwrap();
        let sig = signer(&handle).sign(&data).unwrap();
        let verify = verifier(&handle);
        prop_assert!(verify.verify(&sig, &data).is_ok());

        let mut tampered = sig.clone();
        let at = flip.index(tampered.len());
        tampered[at] ^= 0x01;
        prop_assert!(verify.verify(&tampered, &data).is_err());
    }
}
