// Reference Tests
// Declared-kind parsing and syntax inference

use ledgerctl::resolver::{EntityReference, ReferenceKind, ResolveError};
use ledgerctl::types::{EntityId, ErrorKind};

#[test]
fn test_parse_each_kind() {
    assert_eq!(
        EntityReference::parse("alice", ReferenceKind::Alias).unwrap(),
        EntityReference::Alias("alice".into())
    );
    assert_eq!(
        EntityReference::parse("0.0.1001", ReferenceKind::EntityId).unwrap(),
        EntityReference::EntityId(EntityId::new(0, 0, 1001))
    );
    assert_eq!(
        EntityReference::parse(
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf",
            ReferenceKind::EvmAddress
        )
        .unwrap()
        .kind(),
        ReferenceKind::EvmAddress
    );
}

#[test]
fn test_parse_rejects_wrong_syntax_for_kind() {
    let cases = [
        ("0.0.1001", ReferenceKind::Alias),
        ("alice", ReferenceKind::EntityId),
        ("0.0.x", ReferenceKind::EntityId),
        ("7e5f4552091a69125d5dfcb7b8c2659029395bdf", ReferenceKind::EvmAddress),
        ("0x7e5f", ReferenceKind::EvmAddress),
    ];

    for (reference, kind) in cases {
        let err = EntityReference::parse(reference, kind).unwrap_err();
        assert!(
            matches!(err, ResolveError::InvalidReference { .. }),
            "{reference} as {kind}"
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

#[test]
fn test_infer_kind_from_syntax() {
    let cases = [
        ("alice", ReferenceKind::Alias),
        ("0.0.1001", ReferenceKind::EntityId),
        (
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf",
            ReferenceKind::EvmAddress,
        ),
    ];

    for (reference, kind) in cases {
        assert_eq!(EntityReference::infer(reference).unwrap().kind(), kind);
    }
}

#[test]
fn test_reference_kind_names() {
    assert_eq!("alias".parse::<ReferenceKind>().unwrap(), ReferenceKind::Alias);
    assert_eq!("entity_id".parse::<ReferenceKind>().unwrap(), ReferenceKind::EntityId);
    assert_eq!("EVM-ADDRESS".parse::<ReferenceKind>().unwrap(), ReferenceKind::EvmAddress);
    assert!(matches!(
        "name".parse::<ReferenceKind>(),
        Err(ResolveError::UnknownReferenceKind(_))
    ));
}
