//! Authorization code storage.
//!
//! # Implementation Notes
//!
//! Implementations must make [`AuthorizationCodeStorage::consume`] atomic:
//! finding an unused record and marking it used is one conditional update,
//! so that exactly one of several concurrent exchanges of the same code
//! succeeds. The SQL equivalent is:
//!
//! ```sql
//! UPDATE authorization_codes
//! SET used = true
//! WHERE code = $1 AND client_id = $2 AND redirect_uri = $3
//!   AND used = false AND expires_at > NOW()
//! RETURNING *
//! ```
//!
//! Never log authorization codes.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;

use crate::oauth::code::{AuthorizationCode, CodeError};

/// Storage operations for authorization codes.
#[async_trait]
pub trait AuthorizationCodeStorage: Send + Sync {
    /// Persists a newly issued code.
    ///
    /// # Errors
    ///
    /// Returns `CodeError::Collision` if the code already exists.
    async fn create(&self, record: AuthorizationCode) -> Result<(), CodeError>;

    /// Atomically consumes an unused code bound to `client_id` and
    /// `redirect_uri`.
    ///
    /// # Errors
    ///
    /// - `CodeError::InvalidOrExpired` if no unused record matches all three
    ///   values. Unknown and already used codes are indistinguishable.
    /// - `CodeError::Expired` if the matching record has expired. The record
    ///   is left unused.
    async fn consume(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
    ) -> Result<AuthorizationCode, CodeError>;

    /// Deletes records that expired before now. Returns the number removed.
    ///
    /// The server runs this periodically to bound memory.
    async fn purge_expired(&self) -> Result<usize, CodeError>;
}

/// In-memory authorization code store.
///
/// Consume runs under the per-key entry lock of the underlying `DashMap`,
/// which gives compare-and-set semantics without a global lock.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationCodeStorage {
    codes: DashMap<String, AuthorizationCode>,
}

impl InMemoryAuthorizationCodeStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, used or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns `true` if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl AuthorizationCodeStorage for InMemoryAuthorizationCodeStorage {
    async fn create(&self, record: AuthorizationCode) -> Result<(), CodeError> {
        match self.codes.entry(record.code.clone()) {
            Entry::Occupied(_) => Err(CodeError::Collision),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn consume(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
    ) -> Result<AuthorizationCode, CodeError> {
        let mut entry = self
            .codes
            .get_mut(code)
            .ok_or(CodeError::InvalidOrExpired)?;

        let record = entry.value_mut();
        if record.used || record.client_id != client_id || record.redirect_uri != redirect_uri {
            return Err(CodeError::InvalidOrExpired);
        }

        if record.is_expired() {
            return Err(CodeError::Expired);
        }

        record.used = true;
        Ok(record.clone())
    }

    async fn purge_expired(&self) -> Result<usize, CodeError> {
        let now = OffsetDateTime::now_utc();
        let before = self.codes.len();
        self.codes.retain(|_, record| !record.is_expired_at(now));
        Ok(before.saturating_sub(self.codes.len()))
    }
}
