//! Outstanding challenges, one per client.

use sigauth_core::Nonce;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Challenge material the server is waiting for a client to sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Challenge {
    /// Issued by the one-way challenge protocol.
    OneWay { nonce: Nonce },
    /// Issued by the mutual protocol.
    Mutual {
        client_nonce: Nonce,
        server_nonce: Nonce,
    },
}

/// Pending challenges keyed by client id.
///
/// Both protocols share one slot per client: issuing a new challenge of either
/// shape replaces whatever was pending.
pub struct ChallengeStore {
    pending: Mutex<HashMap<String, Challenge>>,
}

impl ChallengeStore {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Record `challenge` for `client_id`, returning the one it cancelled.
    pub fn issue(&self, client_id: &str, challenge: Challenge) -> Option<Challenge> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.insert(client_id.to_string(), challenge)
    }

    /// Current challenge for `client_id`, left in place.
    pub fn get(&self, client_id: &str) -> Option<Challenge> {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.get(client_id).copied()
    }

    /// Remove the challenge for `client_id` only if it is still `expected`.
    ///
    /// Returns `false` if the slot is empty or now holds a different challenge,
    /// so a verification can succeed at most once per issued challenge.
    pub fn consume(&self, client_id: &str, expected: &Challenge) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.get(client_id) {
            Some(current) if current == expected => {
                pending.remove(client_id);
                true
            }
            _ => false,
        }
    }

    /// Number of clients with a pending challenge.
    pub fn count(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for ChallengeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_issue_and_get() {
        let store = ChallengeStore::new();
        let challenge = Challenge::OneWay { nonce: 42 };

        assert!(store.issue("alice", challenge).is_none());
        assert_eq!(store.get("alice"), Some(challenge));
        // get does not consume
        assert_eq!(store.get("alice"), Some(challenge));
    }

    #[test]
    fn test_reissue_cancels_previous() {
        let store = ChallengeStore::new();
        let first = Challenge::OneWay { nonce: 1 };
        let second = Challenge::Mutual {
            client_nonce: 2,
            server_nonce: 3,
        };

        store.issue("alice", first);
        assert_eq!(store.issue("alice", second), Some(first));
        assert_eq!(store.count(), 1);

        // The cancelled challenge can no longer be consumed.
        assert!(!store.consume("alice", &first));
        assert!(store.consume("alice", &second));
    }

    #[test]
    fn test_consume_once() {
        let store = ChallengeStore::new();
        let challenge = Challenge::OneWay { nonce: 7 };
        store.issue("alice", challenge);

        assert!(store.consume("alice", &challenge));
        assert!(!store.consume("alice", &challenge));
        assert!(store.get("alice").is_none());
    }

    #[test]
    fn test_clients_independent() {
        let store = ChallengeStore::new();
        store.issue("alice", Challenge::OneWay { nonce: 1 });
        store.issue("bob", Challenge::OneWay { nonce: 1 });

        assert!(store.consume("alice", &Challenge::OneWay { nonce: 1 }));
        assert_eq!(store.get("bob"), Some(Challenge::OneWay { nonce: 1 }));
    }

    #[test]
    fn test_concurrent_consume_single_winner() {
        let store = Arc::new(ChallengeStore::new());
        let challenge = Challenge::OneWay { nonce: 99 };
        store.issue("alice", challenge);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.consume("alice", &challenge))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
