//! Authenticated client ids.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

/// Set of clients that completed a protocol run.
///
/// Membership lasts for the life of the process; there is no expiry or logout.
pub struct SessionState {
    authenticated: RwLock<HashSet<String>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            authenticated: RwLock::new(HashSet::new()),
        }
    }

    /// Mark `client_id` authenticated. Returns `false` if it already was.
    pub fn mark_authenticated(&self, client_id: &str) -> bool {
        let mut authenticated = self
            .authenticated
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        authenticated.insert(client_id.to_string())
    }

    pub fn is_authenticated(&self, client_id: &str) -> bool {
        let authenticated = self
            .authenticated
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        authenticated.contains(client_id)
    }

    pub fn count(&self) -> usize {
        self.authenticated
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_is_idempotent() {
        let sessions = SessionState::new();

        assert!(!sessions.is_authenticated("alice"));
        assert!(sessions.mark_authenticated("alice"));
        assert!(!sessions.mark_authenticated("alice"));
        assert!(sessions.is_authenticated("alice"));
        assert_eq!(sessions.count(), 1);
    }
}
