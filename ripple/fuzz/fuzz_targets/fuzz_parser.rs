#![no_main]

use libfuzzer_sys::fuzz_target;
use ripple::Engine;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let mut engine = Engine::new();

        if engine.load(s).is_ok() {
            engine.resolve();
        }
    }
});
