//! Pruning through the `SlashingProtection` facade

use bulwark_core::{Epoch, PublicKey, SigningRoot, Slot, ValidatorId};
use bulwark_slashing::dao::{low_watermark, signed_attestations, signed_blocks};
use bulwark_slashing::{DbSlashingProtection, SlashingDatabase, SlashingError, SlashingProtection};

fn root(byte: u8) -> SigningRoot {
    SigningRoot::new([byte; 32])
}

/// Registers a validator with ten blocks (slots 0-9) and ten attestations
/// (epochs 0-9), watermarks initialized at zero
fn seeded_validator(p: &DbSlashingProtection, key: &str) -> ValidatorId {
    let id = p
        .register_validators(&[PublicKey::from_hex(key).unwrap()])
        .unwrap()[0];
    p.database()
        .with_transaction(|tx| {
            for i in 0..10u64 {
                let r = root(i as u8);
                signed_blocks::insert(tx, id, Slot::new(i), &r)?;
                signed_attestations::insert(tx, id, Epoch::new(i), Epoch::new(i), &r)?;
            }
            low_watermark::init_slot_if_unset(tx, id, Slot::new(0))?;
            low_watermark::init_epochs_if_unset(tx, id, Epoch::new(0), Epoch::new(0))
        })
        .unwrap();
    id
}

fn remaining(p: &DbSlashingProtection, id: ValidatorId) -> (Vec<u64>, Vec<u64>) {
    p.database()
        .with_transaction(|tx| {
            let slots = signed_blocks::for_validator(tx, id)?
                .into_iter()
                .map(|b| b.slot.as_u64())
                .collect();
            let targets = signed_attestations::for_validator(tx, id)?
                .into_iter()
                .map(|a| a.target_epoch.as_u64())
                .collect();
            Ok((slots, targets))
        })
        .unwrap()
}

fn protection() -> DbSlashingProtection {
    DbSlashingProtection::new(SlashingDatabase::open_in_memory().unwrap())
}

#[test]
fn test_prune_keeps_newest_entries() {
    for keep in [1u64, 2, 5, 9, 10, 20] {
        let p = protection();
        let id = seeded_validator(&p, "0x01");

        let outcome = p.prune(keep, id).unwrap();
        let removed = 10u64.saturating_sub(keep);

        assert_eq!(outcome.blocks_deleted as u64, removed, "keep={}", keep);
        assert_eq!(outcome.attestations_deleted as u64, removed, "keep={}", keep);

        let expected: Vec<u64> = (removed..10).collect();
        let (slots, targets) = remaining(&p, id);
        assert_eq!(slots, expected, "keep={}", keep);
        assert_eq!(targets, expected, "keep={}", keep);

        let watermark = outcome.watermark.unwrap();
        assert_eq!(watermark.slot, Some(Slot::new(removed)));
        assert_eq!(watermark.source_epoch, Some(Epoch::new(removed)));
        assert_eq!(watermark.target_epoch, Some(Epoch::new(removed)));
    }
}

#[test]
fn test_watermark_is_not_moved_lower() {
    let p = protection();
    let id = seeded_validator(&p, "0x01");
    p.database()
        .with_transaction(|tx| {
            low_watermark::raise_slot(tx, id, Slot::new(8))?;
            low_watermark::raise_epochs(tx, id, Epoch::new(8), Epoch::new(8))
        })
        .unwrap();

    let outcome = p.prune(5, id).unwrap();

    let (slots, targets) = remaining(&p, id);
    assert_eq!(slots, vec![8, 9]);
    assert_eq!(targets, vec![8, 9]);
    let watermark = outcome.watermark.unwrap();
    assert_eq!(watermark.slot, Some(Slot::new(8)));
    assert_eq!(watermark.target_epoch, Some(Epoch::new(8)));
}

#[test]
fn test_no_pruning_occurs_without_watermark() {
    let p = protection();
    let id = p
        .register_validators(&[PublicKey::from_hex("0x01").unwrap()])
        .unwrap()[0];
    p.database()
        .with_transaction(|tx| {
            for i in 0..10u64 {
                signed_blocks::insert(tx, id, Slot::new(i), &root(i as u8))?;
            }
            Ok(())
        })
        .unwrap();

    let outcome = p.prune(1, id).unwrap();

    assert_eq!(outcome.blocks_deleted, 0);
    assert_eq!(outcome.watermark, None);
    assert_eq!(remaining(&p, id).0.len(), 10);
    assert!(p.watermark(id).unwrap().is_none());
}

#[test]
fn test_other_validators_are_untouched() {
    let p = protection();
    let first = seeded_validator(&p, "0x01");
    let second = seeded_validator(&p, "0x02");

    p.prune(3, first).unwrap();

    assert_eq!(remaining(&p, first).0, vec![7, 8, 9]);
    assert_eq!(remaining(&p, second).0.len(), 10);
    assert_eq!(p.watermark(second).unwrap().unwrap().slot, Some(Slot::new(0)));
}

#[test]
fn test_unregistered_validator_is_a_no_op() {
    let p = protection();
    let id = seeded_validator(&p, "0x01");

    let outcome = p.prune(1, ValidatorId::new(id.as_i64() + 100)).unwrap();

    assert_eq!(outcome.blocks_deleted, 0);
    assert_eq!(remaining(&p, id).0.len(), 10);
}

#[test]
fn test_repeated_pruning_is_stable() {
    let p = protection();
    let id = seeded_validator(&p, "0x01");

    p.prune(4, id).unwrap();
    let again = p.prune(4, id).unwrap();

    assert_eq!(again.blocks_deleted, 0);
    assert_eq!(again.attestations_deleted, 0);
    assert_eq!(remaining(&p, id).0, vec![6, 7, 8, 9]);
}

#[test]
fn test_prune_all_covers_every_validator() {
    let p = protection();
    let first = seeded_validator(&p, "0x01");
    let second = seeded_validator(&p, "0x02");

    let summary = p.prune_all(2).unwrap();

    assert_eq!(summary.validators_pruned, 2);
    assert_eq!(summary.blocks_deleted, 16);
    assert_eq!(summary.attestations_deleted, 16);
    assert_eq!(remaining(&p, first).0, vec![8, 9]);
    assert_eq!(remaining(&p, second).1, vec![8, 9]);
}

#[test]
fn test_zero_entries_to_keep_is_rejected() {
    let p = protection();
    let id = seeded_validator(&p, "0x01");

    assert!(matches!(p.prune(0, id), Err(SlashingError::InvalidPruneAmount)));
    assert_eq!(remaining(&p, id).0.len(), 10);
}
