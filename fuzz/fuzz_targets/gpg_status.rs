#![no_main]

use aptpages::keyring::{parse_import_status, validate_private_import, validate_public_import};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Some(result) = parse_import_status(&text) {
        let _ = validate_public_import(&result);
        if let Ok(fpr) = validate_private_import(&result) {
            assert_eq!(result.count, 1);
            assert!(result.secret_imported.saturating_add(result.secret_unchanged) > 0);
            assert!(result.imports.iter().any(|i| i.fingerprint == fpr));
        }
    }
});
