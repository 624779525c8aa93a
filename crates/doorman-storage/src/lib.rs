//! # doorman-storage
//!
//! The storage seam of Doorman: the [`UserStorage`] contract, the user
//! row entity, and two adapters behind it.
//!
//! ## Modules
//!
//! - `row` - the user row entity and typed profile field access
//! - `backend` - the `UserStorage` trait and capability types
//! - `sqlite` - SQLite adapter built on sqlx
//! - `memory` - map-backed adapter for tests and embedding

pub mod backend;
pub mod memory;
pub mod row;
pub mod sqlite;

pub use backend::{Atomicity, SchemaMode, StorageCapabilities, UserStorage};
pub use memory::MemoryStorage;
pub use row::{FieldValue, ProfileField, UserId, UserRow, UserSummary};
pub use sqlite::SqliteStorage;
