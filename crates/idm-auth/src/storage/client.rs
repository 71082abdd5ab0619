//! Client storage.
//!
//! The issuer only reads clients. Registration happens administratively,
//! through configuration seeding or [`InMemoryClientStorage::insert`].

use async_trait::async_trait;
use dashmap::DashMap;

use crate::AuthResult;
use crate::types::Client;

// =============================================================================
// Client Storage Trait
// =============================================================================

/// Read access to registered OAuth 2.0 clients.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Find a client by its OAuth client_id.
    ///
    /// Returns the registration whether or not it is active; callers decide
    /// how to treat inactive clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

/// Client registry held in memory.
#[derive(Debug, Default)]
pub struct InMemoryClientStorage {
    clients: DashMap<String, Client>,
}

impl InMemoryClientStorage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with `clients`. Later duplicates replace
    /// earlier ones.
    #[must_use]
    pub fn with_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        let storage = Self::new();
        for client in clients {
            storage.insert(client);
        }
        storage
    }

    /// Registers or replaces a client.
    pub fn insert(&self, client: Client) {
        self.clients.insert(client.client_id.clone(), client);
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl ClientStorage for InMemoryClientStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.get(client_id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_lookup() {
        let storage = InMemoryClientStorage::with_clients([
            Client::new("a", "A", vec!["https://a/cb".to_string()]),
            Client::new("b", "B", vec!["https://b/cb".to_string()]),
        ]);
        assert_eq!(storage.len(), 2);

        let found = storage.find_by_client_id("a").await.unwrap().unwrap();
        assert_eq!(found.name, "A");
        assert!(storage.find_by_client_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_replaces() {
        let storage = InMemoryClientStorage::new();
        assert!(storage.is_empty());

        storage.insert(Client::new("a", "First", vec!["https://a/cb".to_string()]));
        storage.insert(Client::new("a", "Second", vec!["https://a/cb".to_string()]));

        assert_eq!(storage.len(), 1);
        let found = storage.find_by_client_id("a").await.unwrap().unwrap();
        assert_eq!(found.name, "Second");
    }

    #[tokio::test]
    async fn test_inactive_client_is_returned() {
        let mut client = Client::new("a", "A", vec!["https://a/cb".to_string()]);
        client.active = false;
        let storage = InMemoryClientStorage::with_clients([client]);

        let found = storage.find_by_client_id("a").await.unwrap().unwrap();
        assert!(!found.active);
    }
}
