//! ML-DSA keysets, including rotation away from a classical key type

use once_cell::sync::Lazy;
use proptest::prelude::*;
use tessera_key::{
    KeyRegistry, KeysetCodec, KeysetHandle, SecretKeyAccess, Signer, Verifier, WrappedSigner,
    WrappedVerifier,
};
use tessera_pqcrypto::{ml_dsa_44, ml_dsa_65, ml_dsa_87};

static REGISTRY: Lazy<KeyRegistry> = Lazy::new(|| {
    let registry = KeyRegistry::new();
    tessera_pqcrypto::register_with(&registry).unwrap();
    registry
});

#[test]
fn every_level_signs_through_a_keyset() {
    for template in [ml_dsa_44(), ml_dsa_65(), ml_dsa_87()] {
        let handle = KeysetHandle::generate_new_with(&REGISTRY, &template).unwrap();
        let signer: WrappedSigner = handle.primitive_with(&REGISTRY).unwrap();
        let verifier: WrappedVerifier = handle
            .public_keyset_handle_with(&REGISTRY)
            .unwrap()
            .primitive_with(&REGISTRY)
            .unwrap();
        let sig = signer.sign(b"payload").unwrap();
        verifier.verify(&sig, b"payload").unwrap();
    }
}

#[test]
fn levels_rotate_within_one_keyset() {
    let handle = KeysetHandle::generate_new_with(&REGISTRY, &ml_dsa_44()).unwrap();
    let signer: WrappedSigner = handle.primitive_with(&REGISTRY).unwrap();
    let old = signer.sign(b"payload").unwrap();

    let next = handle.add_new_key_with(&REGISTRY, &ml_dsa_87()).unwrap();
    handle.set_primary(next).unwrap();
    let signer: WrappedSigner = handle.primitive_with(&REGISTRY).unwrap();
    let new = signer.sign(b"payload").unwrap();

    let verifier: WrappedVerifier = handle
        .public_keyset_handle_with(&REGISTRY)
        .unwrap()
        .primitive_with(&REGISTRY)
        .unwrap();
    verifier.verify(&old, b"payload").unwrap();
    verifier.verify(&new, b"payload").unwrap();
}

#[test]
fn public_keysets_serialize_without_secret_access() {
    let handle = KeysetHandle::generate_new_with(&REGISTRY, &ml_dsa_65()).unwrap();
    let public = handle.public_keyset_handle_with(&REGISTRY).unwrap();
    let codec = KeysetCodec::json();
    let bytes = codec.serialize_without_secret(&public).unwrap();
    let parsed = codec.parse_without_secret_with(&bytes, &REGISTRY).unwrap();
    assert_eq!(*parsed.keyset(), *public.keyset());
    assert!(codec.serialize_without_secret(&handle).is_err());
    assert!(codec.serialize(&handle, SecretKeyAccess::insecure()).is_ok());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn signatures_bind_the_message(
        data in prop::collection::vec(any::<u8>(), 1..256),
        at in any::<prop::sample::Index>(),
    ) {
        let handle = KeysetHandle::generate_new_with(&REGISTRY, &ml_dsa_44()).unwrap();
        let signer: WrappedSigner = handle.primitive_with(&REGISTRY).unwrap();
        let verifier: WrappedVerifier = handle
            .public_keyset_handle_with(&REGISTRY)
            .unwrap()
            .primitive_with(&REGISTRY)
            .unwrap();
        let sig = signer.sign(&data).unwrap();
        prop_assert!(verifier.verify(&sig, &data).is_ok());

        let mut altered = data.clone();
        let i = at.index(altered.len());
        altered[i] ^= 0x80;
        prop_assert!(verifier.verify(&sig, &altered).is_err());
    }
}
