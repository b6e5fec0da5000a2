//! Challenge nonces.

use crate::{Error, Result};

/// A challenge nonce. Travels as a JSON integer and is signed as its decimal
/// string.
pub type Nonce = u64;

/// Draw a nonce from the operating system's CSPRNG.
pub fn generate_nonce() -> Result<Nonce> {
    let mut bytes = [0u8; 8];
    getrandom::fill(&mut bytes).map_err(|e| Error::Randomness(e.to_string()))?;
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_nonces_do_not_repeat() {
        let nonces: HashSet<Nonce> = (0..1000).map(|_| generate_nonce().unwrap()).collect();
        assert_eq!(nonces.len(), 1000);
    }

    #[test]
    fn test_nonces_use_wide_range() {
        // 64 draws all below 2^32 would mean the high bytes are never filled.
        let any_wide = (0..64).any(|_| generate_nonce().unwrap() > u64::from(u32::MAX));
        assert!(any_wide);
    }
}
