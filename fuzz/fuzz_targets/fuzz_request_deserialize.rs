//! Fuzz target for request deserialization.
//!
//! Every request body the server accepts is parsed and field-checked; this
//! must never panic whatever the client sends.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sigauth_handshake::messages::{
    MutualInitRequest, RegisterRequest, TimestampAuthRequest, VerifyRequest,
};

fuzz_target!(|data: &[u8]| {
    if let Ok(req) = serde_json::from_slice::<RegisterRequest>(data) {
        let _ = sigauth_handshake::messages::required(&req.public_key, "public_key");
    }
    if let Ok(req) = serde_json::from_slice::<TimestampAuthRequest>(data) {
        let _ = req.fields();
    }
    if let Ok(req) = serde_json::from_slice::<VerifyRequest>(data) {
        let _ = req.fields();
    }
    if let Ok(req) = serde_json::from_slice::<MutualInitRequest>(data) {
        let _ = req.fields();
    }
});
