//! Racing signing requests against one store

use std::sync::{Arc, Barrier};
use std::thread;

use bulwark_core::{
    Epoch, GenesisValidatorsRoot, PublicKey, RefusalReason, SigningRoot, Slot,
};
use bulwark_slashing::{DbSlashingProtection, SlashingDatabase, SlashingProtection};
use tempfile::TempDir;

const THREADS: usize = 8;

fn gvr() -> GenesisValidatorsRoot {
    GenesisValidatorsRoot::new([0x11; 32])
}

#[test]
fn test_conflicting_blocks_race_approves_exactly_one() {
    let p = Arc::new(DbSlashingProtection::new(
        SlashingDatabase::open_in_memory().unwrap(),
    ));
    let id = p
        .register_validators(&[PublicKey::from_hex("0x01").unwrap()])
        .unwrap()[0];
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let p = Arc::clone(&p);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                p.may_sign_block(id, Slot::new(42), &SigningRoot::new([i as u8; 32]), &gvr())
                    .unwrap()
            })
        })
        .collect();

    let decisions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let approved = decisions.iter().filter(|d| d.is_allowed()).count();

    assert_eq!(approved, 1);
    assert!(decisions
        .iter()
        .filter(|d| !d.is_allowed())
        .all(|d| d.reason() == Some(RefusalReason::DoubleProposal)));
}

#[test]
fn test_conflicting_attestations_race_across_connections() {
    // two handles on one file behave like two signer processes
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("slashing.db");
    let first = Arc::new(DbSlashingProtection::new(SlashingDatabase::create(&path).unwrap()));
    let second = Arc::new(DbSlashingProtection::new(SlashingDatabase::open(&path).unwrap()));
    let id = first
        .register_validators(&[PublicKey::from_hex("0x01").unwrap()])
        .unwrap()[0];
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let p = if i % 2 == 0 {
                Arc::clone(&first)
            } else {
                Arc::clone(&second)
            };
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                p.may_sign_attestation(
                    id,
                    Epoch::new(3),
                    Epoch::new(4),
                    &SigningRoot::new([i as u8; 32]),
                    &gvr(),
                )
                .unwrap()
            })
        })
        .collect();

    let approved = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|d| d.is_allowed())
        .count();
    assert_eq!(approved, 1);
}

#[test]
fn test_different_validators_progress_independently() {
    let p = Arc::new(DbSlashingProtection::new(
        SlashingDatabase::open_in_memory().unwrap(),
    ));
    let keys: Vec<_> = (1..=THREADS as u8)
        .map(|b| PublicKey::new(vec![b]).unwrap())
        .collect();
    let ids = p.register_validators(&keys).unwrap();

    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let p = Arc::clone(&p);
            thread::spawn(move || {
                (0..20u64)
                    .map(|slot| {
                        p.may_sign_block(id, Slot::new(slot), &SigningRoot::new([7; 32]), &gvr())
                            .unwrap()
                    })
                    .all(|d| d.is_allowed())
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
