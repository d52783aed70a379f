#![no_main]

use libfuzzer_sys::fuzz_target;
use xip_rs::{ArchiveInfo, ArchiveReader};

fuzz_target!(|data: &[u8]| {
    // Try to decode - should never panic
    let reader = match ArchiveReader::from_bytes(data) {
        Ok(r) => r,
        Err(_) => return, // Expected for invalid data
    };

    // Header is derived from the decoded sections and must re-encode
    let _ = reader.header();
    if let Ok(bytes) = reader.archive().encode() {
        assert!(ArchiveReader::from_bytes(&bytes).is_ok());
    }

    // Resolve names and read every entry - should never panic
    let _ = ArchiveInfo::from_archive(reader.archive());
    for index in 0..reader.archive().files.len() {
        let _ = reader.archive().entry_data(index);
    }

    let _ = reader.contains("a.txt");
    let _ = reader.contains("");
    let _ = reader.contains("..\\..\\evil");
});
