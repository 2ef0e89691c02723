//! Keyset invariants, handle mutation semantics and codec round trips

use once_cell::sync::Lazy;
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::HashSet;
use tessera_key::{
    KeyData, KeyEntry, KeyHandler, KeyMaterialKind, KeyRegistry, KeyStatus, Keyset, KeysetCodec,
    KeysetError, KeysetHandle, OutputPrefixKind, Primitive, PrimitiveKind, Result,
    SecretKeyAccess,
};

const TYPE_URL: &str = "type.tessera.dev/tests.OpaqueKey";
const PRIVATE_TYPE_URL: &str = "type.tessera.dev/tests.OpaquePrivateKey";
const PUBLIC_TYPE_URL: &str = "type.tessera.dev/tests.OpaquePublicKey";
const REMOTE_TYPE_URL: &str = "type.tessera.dev/tests.OpaqueRemoteKey";

const MATERIALS: [KeyMaterialKind; 4] = [
    KeyMaterialKind::Symmetric,
    KeyMaterialKind::AsymmetricPrivate,
    KeyMaterialKind::AsymmetricPublic,
    KeyMaterialKind::Remote,
];

fn type_url(kind: KeyMaterialKind) -> &'static str {
    match kind {
        KeyMaterialKind::Symmetric => TYPE_URL,
        KeyMaterialKind::AsymmetricPrivate => PRIVATE_TYPE_URL,
        KeyMaterialKind::AsymmetricPublic => PUBLIC_TYPE_URL,
        KeyMaterialKind::Remote => REMOTE_TYPE_URL,
    }
}

/// Handler that only vouches for the material kind of its key type
struct OpaqueHandler(KeyMaterialKind);

impl KeyHandler for OpaqueHandler {
    fn type_url(&self) -> &str {
        type_url(self.0)
    }
    fn material_kind(&self) -> KeyMaterialKind {
        self.0
    }
    fn supported_primitives(&self) -> &[PrimitiveKind] {
        &[]
    }
    fn validate_params(&self, _params: &serde_json::Value) -> Result<()> {
        Ok(())
    }
    fn validate_key(&self, _key: &[u8]) -> Result<()> {
        Ok(())
    }
    fn generate(&self, _params: &serde_json::Value) -> Result<Vec<u8>> {
        Ok(vec![0; 16])
    }
    fn primitive(&self, kind: PrimitiveKind, _key: &[u8]) -> Result<Primitive> {
        Err(KeysetError::UnsupportedPrimitive {
            type_url: self.type_url().to_string(),
            primitive: kind,
        })
    }
}

static REGISTRY: Lazy<KeyRegistry> = Lazy::new(|| {
    let registry = KeyRegistry::new();
    for kind in MATERIALS {
        registry.register_handler(OpaqueHandler(kind)).unwrap();
    }
    registry
});

fn status() -> impl Strategy<Value = KeyStatus> {
    prop_oneof![
        Just(KeyStatus::Enabled),
        Just(KeyStatus::Disabled),
        Just(KeyStatus::Destroyed),
    ]
}

fn prefix() -> impl Strategy<Value = OutputPrefixKind> {
    prop_oneof![
        Just(OutputPrefixKind::Tink),
        Just(OutputPrefixKind::Legacy),
        Just(OutputPrefixKind::Crunchy),
        Just(OutputPrefixKind::Raw),
    ]
}

fn material() -> impl Strategy<Value = KeyMaterialKind> {
    prop_oneof![
        Just(KeyMaterialKind::Symmetric),
        Just(KeyMaterialKind::AsymmetricPrivate),
        Just(KeyMaterialKind::AsymmetricPublic),
        Just(KeyMaterialKind::Remote),
    ]
}

type EntrySpec = (KeyStatus, OutputPrefixKind, KeyMaterialKind, Vec<u8>);

fn entry_spec() -> impl Strategy<Value = EntrySpec> {
    (status(), prefix(), material(), vec(any::<u8>(), 1..32))
}

fn build_entry(key_id: u32, spec: &EntrySpec, primary: bool) -> KeyEntry {
    let (status, prefix, kind, bytes) = spec;
    let entry = if *status == KeyStatus::Destroyed {
        KeyEntry::destroyed(key_id, type_url(*kind), *prefix)
    } else {
        KeyEntry::new(key_id, KeyData::new(type_url(*kind), bytes.clone(), *kind), *status, *prefix)
    };
    if primary {
        entry.into_primary()
    } else {
        entry
    }
}

/// A valid keyset: unique ids, and a primary on one enabled entry when any exists
fn valid_keyset(ids: &std::collections::BTreeSet<u32>, specs: &[EntrySpec], pick: &Index) -> Keyset {
    let enabled: Vec<u32> = ids
        .iter()
        .zip(specs)
        .filter(|(_, spec)| spec.0 == KeyStatus::Enabled)
        .map(|(id, _)| *id)
        .collect();
    let primary = (!enabled.is_empty()).then(|| enabled[pick.index(enabled.len())]);
    let entries = ids
        .iter()
        .zip(specs)
        .map(|(id, spec)| build_entry(*id, spec, Some(*id) == primary))
        .collect();
    Keyset::from_entries(entries).unwrap()
}

fn opaque_key(byte: u8) -> KeyData {
    KeyData::new(TYPE_URL, vec![byte; 16], KeyMaterialKind::Symmetric)
}

proptest! {
    #[test]
    fn validate_accepts_exactly_the_well_formed_keysets(
        raw in vec((0u32..6, entry_spec(), any::<bool>()), 0..6)
    ) {
        let entries: Vec<KeyEntry> = raw
            .iter()
            .map(|(id, spec, primary)| build_entry(*id, spec, *primary))
            .collect();

        let ids: HashSet<u32> = raw.iter().map(|(id, _, _)| *id).collect();
        let primaries: Vec<&EntrySpec> = raw
            .iter()
            .filter(|(_, _, primary)| *primary)
            .map(|(_, spec, _)| spec)
            .collect();
        let expected = !raw.is_empty()
            && ids.len() == raw.len()
            && primaries.len() <= 1
            && primaries.iter().all(|spec| spec.0 == KeyStatus::Enabled);

        let result = Keyset::from_entries(entries);
        prop_assert_eq!(result.is_ok(), expected);
        if let Err(err) = result {
            prop_assert!(matches!(err, KeysetError::InvalidKeyset(_)));
        }
    }

    #[test]
    fn parse_inverts_serialize(
        ids in btree_set(any::<u32>(), 1..6),
        specs in vec(entry_spec(), 6),
        pick in any::<Index>(),
    ) {
        let handle = KeysetHandle::from_keyset(valid_keyset(&ids, &specs, &pick)).unwrap();
        for codec in [KeysetCodec::binary(), KeysetCodec::json()] {
            let bytes = codec.serialize(&handle, SecretKeyAccess::insecure()).unwrap();
            let parsed = codec.parse(&bytes, SecretKeyAccess::insecure()).unwrap();
            prop_assert_eq!(&*parsed.keyset(), &*handle.keyset());
        }
    }

    #[test]
    fn parse_without_secret_matches_secret_content(
        ids in btree_set(any::<u32>(), 1..6),
        specs in vec(entry_spec(), 6),
        pick in any::<Index>(),
    ) {
        let keyset = valid_keyset(&ids, &specs, &pick);
        let has_secret = keyset.entries().iter().any(|entry| {
            entry.key_data().is_some_and(|data| data.material_kind().is_secret())
        });
        let handle = KeysetHandle::from_keyset(keyset).unwrap();
        let bytes = KeysetCodec::binary()
            .serialize(&handle, SecretKeyAccess::insecure())
            .unwrap();

        match KeysetCodec::binary().parse_without_secret_with(&bytes, &REGISTRY) {
            Ok(parsed) => {
                prop_assert!(!has_secret);
                prop_assert_eq!(&*parsed.keyset(), &*handle.keyset());
            }
            Err(err) => {
                prop_assert!(has_secret);
                prop_assert!(matches!(err, KeysetError::SecretKeyAccessDenied));
            }
        }
    }
}

#[test]
fn handle_mutations_walk_the_status_lifecycle() {
    let (keyset, first) = Keyset::new()
        .with_key(opaque_key(1), OutputPrefixKind::Tink, KeyStatus::Enabled, Some(1))
        .unwrap();
    let handle = KeysetHandle::from_keyset(keyset.with_primary(first).unwrap()).unwrap();

    let second = handle
        .add_key(opaque_key(2), OutputPrefixKind::Crunchy, KeyStatus::Disabled)
        .unwrap();
    assert_ne!(second, first);
    assert!(matches!(handle.set_primary(second), Err(KeysetError::InvalidKey(_))));

    handle.enable(second).unwrap();
    handle.set_primary(second).unwrap();
    assert_eq!(handle.primary_key_id(), Some(second));

    handle.destroy(first).unwrap();
    let keyset = handle.keyset();
    let destroyed = keyset.entry(first).unwrap();
    assert_eq!(destroyed.status(), KeyStatus::Destroyed);
    assert!(destroyed.key_data().is_none());
    assert!(matches!(handle.enable(first), Err(KeysetError::InvalidKey(_))));

    // destroyed ids stay reserved
    assert!(matches!(
        handle.add_key_with_id(first, opaque_key(3), OutputPrefixKind::Tink, KeyStatus::Enabled),
        Err(KeysetError::InvalidKeyset(_))
    ));

    handle.delete_key(first).unwrap();
    assert_eq!(handle.keyset().len(), 1);
    assert!(matches!(handle.delete_key(second), Err(KeysetError::InvalidKey(_))));
}

#[test]
fn readers_never_observe_an_invalid_keyset() {
    let (keyset, first) = Keyset::new()
        .with_key(opaque_key(0), OutputPrefixKind::Tink, KeyStatus::Enabled, None)
        .unwrap();
    let handle = KeysetHandle::from_keyset(keyset.with_primary(first).unwrap()).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..500 {
                    let snapshot = handle.keyset();
                    assert!(snapshot.validate().is_ok());
                    assert_eq!(
                        snapshot.entries().iter().filter(|e| e.is_primary()).count(),
                        1
                    );
                }
            });
        }
        scope.spawn(|| {
            for round in 0..200u8 {
                let next = handle
                    .add_key(opaque_key(round), OutputPrefixKind::Raw, KeyStatus::Enabled)
                    .unwrap();
                handle.set_primary(next).unwrap();
            }
        });
    });

    assert_eq!(handle.keyset().len(), 201);
}

#[test]
fn keyset_info_is_exposed_without_material() {
    let (keyset, id) = Keyset::new()
        .with_key(opaque_key(9), OutputPrefixKind::Legacy, KeyStatus::Enabled, Some(7))
        .unwrap();
    let handle = KeysetHandle::from_keyset(keyset.with_primary(id).unwrap()).unwrap();
    let info = handle.info();
    assert_eq!(info.primary_key_id, Some(7));
    assert_eq!(info.keys[0].type_url, TYPE_URL);
    assert_eq!(info.keys[0].output_prefix, OutputPrefixKind::Legacy);
    assert!(!format!("{handle:?}").contains("[9, 9"));
}
