#![no_main]

use aptpages_git::parse_log;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    for entry in parse_log(&text) {
        assert!(!entry.id.is_empty());
        let _ = entry.subject();
        let _ = entry.short_id();
    }
});
