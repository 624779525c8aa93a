//! # Doorman
//!
//! Minimal user-account and session management over a single relational
//! table. Accounts carry an id, a login, a display name, a privilege
//! level, an optional password digest and an optional session token
//! with its expiry; everything lives on the table row and nothing is
//! cached in process.
//!
//! Two components split the work:
//!
//! - [`UserDirectory`] administers accounts: provisioning or attaching
//!   to the table, listing, field reads and writes, credential resets,
//!   creation and removal.
//! - [`SessionAuthenticator`] serves end users: login and session
//!   checks that bind one identity per instance, session termination,
//!   and self-service password changes.
//!
//! Both talk to storage through the [`UserStorage`] contract;
//! [`SqliteStorage`] is the production adapter and [`MemoryStorage`]
//! backs tests and single-process embedding.

pub use doorman_auth::{Identity, SessionAuthenticator, UserDirectory};
pub use doorman_auth::{digest, expiry};
pub use doorman_core::config;
pub use doorman_core::{AppError, AppResult, ErrorKind};
pub use doorman_storage::{
    Atomicity, FieldValue, MemoryStorage, ProfileField, SchemaMode, SqliteStorage,
    StorageCapabilities, UserId, UserRow, UserStorage, UserSummary,
};
