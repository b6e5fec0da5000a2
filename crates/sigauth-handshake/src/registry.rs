//! Client registry: client id → registered public key.

use crate::error::{AuthError, Result};
use sigauth_core::PublicKey;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registered client keys.
///
/// Registration is last-write-wins: registering an existing id replaces its
/// key, and there is no way to remove one.
pub struct Registry {
    clients: RwLock<HashMap<String, PublicKey>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Store `public_key` for `client_id`, returning the key it replaced.
    pub fn register(&self, client_id: &str, public_key: PublicKey) -> Result<Option<PublicKey>> {
        if client_id.is_empty() {
            return Err(AuthError::MissingField("client_id".to_string()));
        }

        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        Ok(clients.insert(client_id.to_string(), public_key))
    }

    /// Look up the key registered for `client_id`.
    pub fn lookup(&self, client_id: &str) -> Result<PublicKey> {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients
            .get(client_id)
            .cloned()
            .ok_or_else(|| AuthError::NotRegistered(client_id.to_string()))
    }

    pub fn contains(&self, client_id: &str) -> bool {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients.contains_key(client_id)
    }

    /// List all registered client ids.
    pub fn list(&self) -> Vec<String> {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients.keys().cloned().collect()
    }

    /// Get the count of registered clients.
    pub fn count(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
