//! User directory used by the session resolver.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::AuthResult;
use crate::types::Principal;

/// Lookup of known users by email.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds a user by email address. Matching is case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Principal>>;
}

/// In-memory user directory keyed by lowercased email.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<String, Principal>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory seeded with `users`.
    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = Principal>) -> Self {
        let directory = Self::new();
        for user in users {
            directory.insert(user);
        }
        directory
    }

    /// Adds or replaces a user.
    pub fn insert(&self, user: Principal) {
        self.users.insert(user.email.to_lowercase(), user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Principal>> {
        if email.is_empty() {
            return Ok(None);
        }
        Ok(self
            .users
            .get(&email.to_lowercase())
            .map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_by_email_case_insensitive() {
        let directory =
            InMemoryUserDirectory::with_users([Principal::new("user-1", "Alice@Example.com")]);

        let found = directory
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.subject, "user-1");

        assert!(directory.find_by_email("bob@example.com").await.unwrap().is_none());
        assert!(directory.find_by_email("").await.unwrap().is_none());
    }
}
