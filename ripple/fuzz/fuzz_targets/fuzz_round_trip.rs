#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(e) = ripple::parse(s) {
            let back = ripple::parse(&e.to_string()).expect("unparse must reparse");
            assert_eq!(back, e);
        }
    }
});
