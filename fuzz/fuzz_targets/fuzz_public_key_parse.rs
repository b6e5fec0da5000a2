//! Fuzz target for PEM public key parsing, as reached by `/register`.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = sigauth_core::PublicKey::from_pem(input);
    }
});
