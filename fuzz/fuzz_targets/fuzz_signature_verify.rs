//! Fuzz target for base64 signature verification.
//!
//! Arbitrary signature strings must be rejected with an error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sigauth_core::signing::verify_b64;
use sigauth_core::{KeyPair, PublicKey};
use std::sync::LazyLock;

static KEY: LazyLock<Option<PublicKey>> = LazyLock::new(|| {
    KeyPair::generate_with_bits(1024)
        .ok()
        .map(|pair| pair.public_key().clone())
});

fuzz_target!(|data: &[u8]| {
    let Some(key) = KEY.as_ref() else {
        return;
    };

    if let Ok(signature) = std::str::from_utf8(data) {
        assert!(verify_b64(key, b"alice:1700000000", signature).is_err());
    }

    // Raw bytes straight into the RSA verifier.
    assert!(key.verify(b"alice:1700000000", data).is_err());
});
