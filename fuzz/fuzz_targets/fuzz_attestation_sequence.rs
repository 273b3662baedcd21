#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use bulwark_core::{Epoch, GenesisValidatorsRoot, PublicKey, SigningRoot};
use bulwark_slashing::{DbSlashingProtection, SlashingDatabase, SlashingProtection};

#[derive(Debug, Arbitrary)]
struct Request {
    source: u8,
    target: u8,
    root: u8,
}

fuzz_target!(|requests: Vec<Request>| {
    let protection = DbSlashingProtection::new(SlashingDatabase::open_in_memory().unwrap());
    let key = PublicKey::from_hex("0x01").unwrap();
    let id = protection.register_validators(&[key]).unwrap()[0];
    let genesis = GenesisValidatorsRoot::new([0; 32]);

    let mut approved: Vec<(u8, u8, u8)> = Vec::new();
    for request in requests.iter().take(64) {
        let decision = protection
            .may_sign_attestation(
                id,
                Epoch::new(request.source as u64),
                Epoch::new(request.target as u64),
                &SigningRoot::new([request.root; 32]),
                &genesis,
            )
            .unwrap();
        if decision.is_allowed() {
            approved.push((request.source, request.target, request.root));
        }
    }

    // No two approved attestations are slashable together
    for (i, a) in approved.iter().enumerate() {
        for b in &approved[i + 1..] {
            if a == b {
                continue;
            }
            assert!(!(a.1 == b.1 && a.2 != b.2), "double vote {:?} {:?}", a, b);
            assert!(!(a.0 < b.0 && a.1 > b.1), "surround {:?} {:?}", a, b);
            assert!(!(b.0 < a.0 && b.1 > a.1), "surround {:?} {:?}", a, b);
        }
    }
});
