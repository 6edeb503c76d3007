#![no_main]

use libfuzzer_sys::fuzz_target;
use vitrine_core::normalize_path;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let once = normalize_path(&raw);
    assert_eq!(normalize_path(&once), once);
    assert!(!once.starts_with('/'));
    assert!(!once.starts_with("./"));
    assert!(!once.contains('?'));
});
