#![no_main]

use libfuzzer_sys::fuzz_target;
use bulwark_core::InterchangeDocument;
use bulwark_slashing::{DbSlashingProtection, SlashingDatabase, SlashingProtection};

fuzz_target!(|data: &[u8]| {
    // Parsing must never panic
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(document) = InterchangeDocument::from_json(text) else {
        return;
    };

    // Serialization of a parsed document round-trips
    if let Ok(json) = document.to_json_pretty() {
        let reparsed = InterchangeDocument::from_json(&json).unwrap();
        assert_eq!(reparsed, document);
    }

    // Import either succeeds or fails cleanly
    let protection = DbSlashingProtection::new(SlashingDatabase::open_in_memory().unwrap());
    let imported = protection.import_data(&mut text.as_bytes()).is_ok();

    // Whatever was imported must export again
    if imported && !document.validators().is_empty() {
        let mut out = Vec::new();
        protection.export_data(&mut out).unwrap();
        InterchangeDocument::from_json(std::str::from_utf8(&out).unwrap()).unwrap();
    }
});
