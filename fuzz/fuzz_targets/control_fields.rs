#![no_main]

use aptpages::deb::{PackageMetadata, parse_control};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let fields = parse_control(&text);
    if let Ok(meta) = PackageMetadata::from_fields(&fields) {
        assert!(!meta.version.is_empty());
        assert!(!meta.architecture.is_empty());
    }
});
