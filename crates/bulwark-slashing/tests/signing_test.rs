//! Live signing decisions through the `SlashingProtection` facade

use bulwark_core::{
    Epoch, GenesisValidatorsRoot, PublicKey, RefusalReason, Safe, SigningDecision, SigningRoot,
    Slot, ValidatorId,
};
use bulwark_slashing::{DbSlashingProtection, SlashingDatabase, SlashingError, SlashingProtection};
use tempfile::TempDir;

fn gvr() -> GenesisValidatorsRoot {
    GenesisValidatorsRoot::new([0x47; 32])
}

fn root(byte: u8) -> SigningRoot {
    SigningRoot::new([byte; 32])
}

fn setup() -> (DbSlashingProtection, ValidatorId) {
    let protection = DbSlashingProtection::new(SlashingDatabase::open_in_memory().unwrap());
    let ids = protection
        .register_validators(&[PublicKey::from_hex("0x01").unwrap()])
        .unwrap();
    (protection, ids[0])
}

fn block(p: &DbSlashingProtection, id: ValidatorId, slot: u64, byte: u8) -> SigningDecision {
    p.may_sign_block(id, Slot::new(slot), &root(byte), &gvr()).unwrap()
}

fn attestation(p: &DbSlashingProtection, id: ValidatorId, source: u64, target: u64, byte: u8) -> SigningDecision {
    p.may_sign_attestation(id, Epoch::new(source), Epoch::new(target), &root(byte), &gvr())
        .unwrap()
}

// ============================================
// Registration
// ============================================

#[test]
fn test_registration_is_idempotent_and_ordered() {
    let protection = DbSlashingProtection::new(SlashingDatabase::open_in_memory().unwrap());
    let a = PublicKey::from_hex("0xaa").unwrap();
    let b = PublicKey::from_hex("0xbb").unwrap();

    let first = protection.register_validators(&[a.clone(), b.clone()]).unwrap();
    let second = protection.register_validators(&[b.clone(), a.clone()]).unwrap();

    assert_eq!(first, vec![second[1], second[0]]);
    assert_eq!(protection.lookup(&a).unwrap(), Some(first[0]));
    assert_eq!(protection.lookup(&PublicKey::from_hex("0xcc").unwrap()).unwrap(), None);
}

// ============================================
// Blocks
// ============================================

#[test]
fn test_block_double_proposal_and_replay() {
    let (p, id) = setup();

    assert_eq!(block(&p, id, 100, 1), SigningDecision::Allowed(Safe::Valid));
    assert_eq!(
        block(&p, id, 100, 2),
        SigningDecision::Refused(RefusalReason::DoubleProposal)
    );
    assert_eq!(block(&p, id, 100, 1), SigningDecision::Allowed(Safe::SameData));
    assert_eq!(block(&p, id, 99, 3), SigningDecision::Refused(RefusalReason::TooOld));
    assert_eq!(block(&p, id, 101, 3), SigningDecision::Allowed(Safe::Valid));

    let watermark = p.watermark(id).unwrap().unwrap();
    assert_eq!(watermark.slot, Some(Slot::new(100)));
}

#[test]
fn test_validators_are_independent() {
    let protection = DbSlashingProtection::new(SlashingDatabase::open_in_memory().unwrap());
    let ids = protection
        .register_validators(&[
            PublicKey::from_hex("0x01").unwrap(),
            PublicKey::from_hex("0x02").unwrap(),
        ])
        .unwrap();

    assert!(block(&protection, ids[0], 10, 1).is_allowed());
    assert!(block(&protection, ids[1], 10, 2).is_allowed());
    assert!(block(&protection, ids[1], 5, 2).reason() == Some(RefusalReason::TooOld));
    assert!(protection.watermark(ids[0]).unwrap().unwrap().slot == Some(Slot::new(10)));
}

#[test]
fn test_unregistered_validator_is_rejected() {
    let (p, _) = setup();
    let result = p.may_sign_block(ValidatorId::new(999), Slot::new(1), &root(1), &gvr());
    assert!(matches!(result, Err(SlashingError::UnregisteredValidator(_))));
}

// ============================================
// Attestations
// ============================================

#[test]
fn test_attestation_slashing_conditions() {
    let (p, id) = setup();

    assert_eq!(attestation(&p, id, 5, 10, 1), SigningDecision::Allowed(Safe::Valid));
    assert_eq!(
        attestation(&p, id, 6, 9, 2),
        SigningDecision::Refused(RefusalReason::Surrounded)
    );
    assert_eq!(
        attestation(&p, id, 4, 11, 2),
        SigningDecision::Refused(RefusalReason::Surrounds)
    );
    assert_eq!(
        attestation(&p, id, 5, 10, 2),
        SigningDecision::Refused(RefusalReason::DoubleVote)
    );
    assert_eq!(attestation(&p, id, 5, 10, 1), SigningDecision::Allowed(Safe::SameData));
    assert_eq!(attestation(&p, id, 10, 11, 3), SigningDecision::Allowed(Safe::Valid));
}

#[test]
fn test_invalid_range_needs_no_registration() {
    let p = DbSlashingProtection::new(SlashingDatabase::open_in_memory().unwrap());
    let decision = p
        .may_sign_attestation(ValidatorId::new(7), Epoch::new(9), Epoch::new(8), &root(1), &gvr())
        .unwrap();
    assert_eq!(decision, SigningDecision::Refused(RefusalReason::InvalidRange));
}

// ============================================
// Genesis validators root
// ============================================

#[test]
fn test_genesis_root_mismatch_is_rejected() {
    let (p, id) = setup();
    assert!(block(&p, id, 1, 1).is_allowed());

    let other = GenesisValidatorsRoot::new([0x99; 32]);
    let result = p.may_sign_block(id, Slot::new(2), &root(2), &other);
    assert!(matches!(
        result,
        Err(SlashingError::GenesisValidatorsRootMismatch { .. })
    ));

    let result = p.may_sign_attestation(id, Epoch::new(1), Epoch::new(2), &root(2), &other);
    assert!(result.unwrap_err().is_validation());
}

#[test]
fn test_genesis_root_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("slashing.db");

    {
        let p = DbSlashingProtection::new(SlashingDatabase::create(&path).unwrap());
        let id = p.register_validators(&[PublicKey::from_hex("0x01").unwrap()]).unwrap()[0];
        assert!(p.may_sign_block(id, Slot::new(1), &root(1), &gvr()).unwrap().is_allowed());
    }

    let p = DbSlashingProtection::new(SlashingDatabase::open(&path).unwrap());
    let id = p.lookup(&PublicKey::from_hex("0x01").unwrap()).unwrap().unwrap();
    let other = GenesisValidatorsRoot::new([0x99; 32]);
    assert!(p.may_sign_block(id, Slot::new(2), &root(2), &other).is_err());

    // history survived too
    assert_eq!(
        p.may_sign_block(id, Slot::new(1), &root(9), &gvr()).unwrap(),
        SigningDecision::Refused(RefusalReason::DoubleProposal)
    );
}

#[test]
fn test_failed_request_does_not_pin_genesis_root() {
    let p = DbSlashingProtection::new(SlashingDatabase::open_in_memory().unwrap());

    // the validator is unknown, so the whole transaction is rolled back
    let first = GenesisValidatorsRoot::new([0x01; 32]);
    assert!(p.may_sign_block(ValidatorId::new(1), Slot::new(1), &root(1), &first).is_err());

    let id = p.register_validators(&[PublicKey::from_hex("0x01").unwrap()]).unwrap()[0];
    let second = GenesisValidatorsRoot::new([0x02; 32]);
    assert!(p.may_sign_block(id, Slot::new(1), &root(1), &second).unwrap().is_allowed());
}
