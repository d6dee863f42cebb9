#![no_main]

use aptpages::annotate::{DEFAULT_SUMMARY, commit_message};
use aptpages::history::extract_fingerprint;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(message) = std::str::from_utf8(data) else {
        return;
    };

    // Whatever parses must re-embed to a message that parses back equal.
    if let Some(fp) = extract_fingerprint(message) {
        let again = commit_message(&fp, DEFAULT_SUMMARY);
        assert_eq!(extract_fingerprint(&again), Some(fp));
    }
});
