//! Interchange export and export -> import -> export round trips

use bulwark_core::{
    Epoch, GenesisValidatorsRoot, InterchangeDocument, PublicKey, SigningRoot, Slot,
    INTERCHANGE_FORMAT_VERSION,
};
use bulwark_slashing::{DbSlashingProtection, SlashingDatabase, SlashingError, SlashingProtection};

fn protection() -> DbSlashingProtection {
    DbSlashingProtection::new(SlashingDatabase::open_in_memory().unwrap())
}

fn gvr() -> GenesisValidatorsRoot {
    GenesisValidatorsRoot::new([0x04; 32])
}

fn export_string(p: &DbSlashingProtection) -> String {
    let mut out = Vec::new();
    p.export_data(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_export_without_genesis_root_fails() {
    let p = protection();
    p.register_validators(&[PublicKey::from_hex("0x01").unwrap()])
        .unwrap();

    let mut out = Vec::new();
    let result = p.export_data(&mut out);
    assert!(matches!(result, Err(SlashingError::MissingGenesisValidatorsRoot)));
    assert!(out.is_empty());
}

#[test]
fn test_export_contains_signed_history() {
    let p = protection();
    let key = PublicKey::from_hex("0x01").unwrap();
    let id = p.register_validators(&[key.clone()]).unwrap()[0];

    p.may_sign_block(id, Slot::new(20), &SigningRoot::new([2; 32]), &gvr())
        .unwrap();
    p.may_sign_block(id, Slot::new(21), &SigningRoot::new([3; 32]), &gvr())
        .unwrap();
    p.may_sign_attestation(id, Epoch::new(1), Epoch::new(2), &SigningRoot::new([4; 32]), &gvr())
        .unwrap();

    let json = export_string(&p);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(
        value["metadata"]["interchange_format_version"],
        INTERCHANGE_FORMAT_VERSION.to_string()
    );
    assert_eq!(value["metadata"]["genesis_validators_root"], gvr().to_hex());
    assert_eq!(value["data"][0]["pubkey"], "0x01");
    assert_eq!(value["data"][0]["signed_blocks"][0]["slot"], "20");
    assert_eq!(value["data"][0]["signed_blocks"][1]["slot"], "21");
    assert_eq!(value["data"][0]["signed_attestations"][0]["source_epoch"], "1");
    assert_eq!(value["data"][0]["signed_attestations"][0]["target_epoch"], "2");
}

#[test]
fn test_export_import_export_round_trip() {
    let source = protection();
    let ids = source
        .register_validators(&[
            PublicKey::from_hex("0x01").unwrap(),
            PublicKey::from_hex("0x02").unwrap(),
        ])
        .unwrap();
    for (offset, id) in ids.iter().enumerate() {
        for slot in 0..5u64 {
            let root = SigningRoot::new([slot as u8 + offset as u8 * 10; 32]);
            source
                .may_sign_block(*id, Slot::new(slot), &root, &gvr())
                .unwrap();
            source
                .may_sign_attestation(*id, Epoch::new(slot), Epoch::new(slot + 1), &root, &gvr())
                .unwrap();
        }
    }
    let first = export_string(&source);

    let target = protection();
    let summary = target.import_data(&mut first.as_bytes()).unwrap();
    assert_eq!(summary.validators, 2);
    assert_eq!(summary.blocks_imported, 10);
    assert_eq!(summary.attestations_imported, 10);
    assert_eq!(summary.conflicts, 0);

    let second = export_string(&target);
    assert_eq!(
        InterchangeDocument::from_json(&first).unwrap(),
        InterchangeDocument::from_json(&second).unwrap()
    );
}

#[test]
fn test_export_of_empty_store_with_genesis_root() {
    let p = protection();
    p.pin_genesis_validators_root(&gvr()).unwrap();

    let doc = InterchangeDocument::from_json(&export_string(&p)).unwrap();
    assert_eq!(doc.metadata.genesis_validators_root, gvr());
    assert!(doc.validators().is_empty());
}
