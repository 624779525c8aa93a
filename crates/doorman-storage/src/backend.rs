//! The storage collaborator contract.
//!
//! Components never speak SQL themselves; everything goes through
//! [`UserStorage`], so backends can be swapped without touching the
//! account or session logic. The contract is intentionally narrow:
//! point queries by id, login and session token, a full scan, a max-id
//! probe, and single-row writes.

use async_trait::async_trait;
use doorman_core::result::AppResult;

use crate::row::{FieldValue, ProfileField, UserId, UserRow};

/// What a backend can and cannot guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageCapabilities {
    /// Multi-statement writes can run inside a transaction.
    pub transactions: bool,
    /// Declared schema constraints are actually enforced on write.
    pub enforced_constraints: bool,
}

/// How the user table is provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    /// Typed columns with NOT NULL and uniqueness constraints.
    Constrained,
    /// Bare columns, nothing enforced by the backend.
    Permissive,
}

/// How a multi-statement write was actually executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Atomicity {
    /// All statements committed or none did.
    Transactional,
    /// Statements ran one after another; a failure can leave partial
    /// state behind.
    Sequential,
}

/// Persistence seam for the user table.
///
/// Row lookups return `Ok(None)` for absent rows; only infrastructure
/// failures surface as errors. Mutations report the number of rows
/// affected so callers can distinguish a missing id from a successful
/// write.
#[async_trait]
pub trait UserStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Name of the backing table.
    fn table(&self) -> &str;

    fn capabilities(&self) -> StorageCapabilities;

    /// Create the user table. Fails if it already exists or if the
    /// backend cannot satisfy the requested mode.
    async fn provision(&self, mode: SchemaMode) -> AppResult<()>;

    /// Verify that the table exists and has the expected columns.
    async fn probe(&self) -> AppResult<()>;

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<UserRow>>;

    async fn find_by_login(&self, login: &str) -> AppResult<Option<UserRow>>;

    async fn find_by_session(&self, token: &str) -> AppResult<Option<UserRow>>;

    /// Every row in the table, ordered by id.
    async fn find_all(&self) -> AppResult<Vec<UserRow>>;

    /// Highest id currently in the table, or `None` when empty.
    async fn max_id(&self) -> AppResult<Option<UserId>>;

    /// Insert a new row and write its credential digest.
    ///
    /// The insert itself carries no credential; `digest` lands through a
    /// follow-up update against the fresh id, wrapped in a transaction
    /// when the backend has one. The returned [`Atomicity`] says which
    /// path was taken.
    async fn create(&self, row: &UserRow, digest: Option<&str>) -> AppResult<Atomicity>;

    /// Overwrite a single profile column.
    async fn update_field(
        &self,
        id: UserId,
        field: ProfileField,
        value: &FieldValue,
    ) -> AppResult<u64>;

    /// Overwrite the credential digest. `None` clears it and disables
    /// the account.
    async fn update_password(&self, id: UserId, digest: Option<&str>) -> AppResult<u64>;

    /// Overwrite the session token and expiry together. The pairing is
    /// part of the contract: both present or both absent, in one write.
    async fn update_session(
        &self,
        id: UserId,
        token: Option<&str>,
        expires_at: Option<&str>,
    ) -> AppResult<u64>;

    /// Delete a row outright, session state included.
    async fn delete(&self, id: UserId) -> AppResult<u64>;
}
