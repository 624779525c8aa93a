//! In-memory adapter for tests and single-process embedding.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use doorman_core::config::storage::validate_table_name;
use doorman_core::error::AppError;
use doorman_core::result::AppResult;

use crate::backend::{Atomicity, SchemaMode, StorageCapabilities, UserStorage};
use crate::row::{FieldValue, ProfileField, UserId, UserRow};

#[derive(Debug, Default)]
struct Inner {
    provisioned: bool,
    rows: BTreeMap<i64, UserRow>,
}

/// [`UserStorage`] over a map behind an `RwLock`.
///
/// Honest about its limits: no transactions, no enforced constraints,
/// and only [`SchemaMode::Permissive`] provisioning. One exception to
/// the permissive stance is the id, which the map cannot duplicate, so
/// a second insert under an existing id is refused.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    state: Arc<RwLock<Inner>>,
    table: String,
}

impl MemoryStorage {
    pub fn new(table: impl Into<String>) -> AppResult<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self {
            state: Arc::new(RwLock::new(Inner::default())),
            table,
        })
    }

    fn ensure(&self, inner: &Inner) -> AppResult<()> {
        if inner.provisioned {
            Ok(())
        } else {
            Err(AppError::storage(format!("no such table: {}", self.table)))
        }
    }
}

#[async_trait]
impl UserStorage for MemoryStorage {
    fn table(&self) -> &str {
        &self.table
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities {
            transactions: false,
            enforced_constraints: false,
        }
    }

    async fn provision(&self, mode: SchemaMode) -> AppResult<()> {
        if mode == SchemaMode::Constrained {
            return Err(AppError::schema(
                "in-memory storage cannot enforce constraints; use permissive mode",
            ));
        }
        let mut inner = self.state.write().await;
        if inner.provisioned {
            return Err(AppError::schema(format!(
                "table '{}' already exists",
                self.table
            )));
        }
        inner.provisioned = true;
        Ok(())
    }

    async fn probe(&self) -> AppResult<()> {
        let inner = self.state.read().await;
        if inner.provisioned {
            Ok(())
        } else {
            Err(AppError::schema(format!(
                "table '{}' is missing",
                self.table
            )))
        }
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<UserRow>> {
        let inner = self.state.read().await;
        self.ensure(&inner)?;
        Ok(inner.rows.get(&id.get()).cloned())
    }

    async fn find_by_login(&self, login: &str) -> AppResult<Option<UserRow>> {
        let inner = self.state.read().await;
        self.ensure(&inner)?;
        Ok(inner.rows.values().find(|r| r.login == login).cloned())
    }

    async fn find_by_session(&self, token: &str) -> AppResult<Option<UserRow>> {
        let inner = self.state.read().await;
        self.ensure(&inner)?;
        Ok(inner
            .rows
            .values()
            .find(|r| r.session.as_deref() == Some(token))
            .cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<UserRow>> {
        let inner = self.state.read().await;
        self.ensure(&inner)?;
        Ok(inner.rows.values().cloned().collect())
    }

    async fn max_id(&self) -> AppResult<Option<UserId>> {
        let inner = self.state.read().await;
        self.ensure(&inner)?;
        Ok(inner.rows.keys().next_back().copied().map(UserId))
    }

    async fn create(&self, row: &UserRow, digest: Option<&str>) -> AppResult<Atomicity> {
        let mut inner = self.state.write().await;
        self.ensure(&inner)?;
        if inner.rows.contains_key(&row.id.get()) {
            return Err(AppError::integrity(format!(
                "user id {} already exists",
                row.id
            )));
        }

        let mut stored = row.clone();
        stored.passwd = None;
        inner.rows.insert(stored.id.get(), stored);
        if let Some(entry) = inner.rows.get_mut(&row.id.get()) {
            entry.passwd = digest.map(String::from);
        }
        Ok(Atomicity::Sequential)
    }

    async fn update_field(
        &self,
        id: UserId,
        field: ProfileField,
        value: &FieldValue,
    ) -> AppResult<u64> {
        let mut inner = self.state.write().await;
        self.ensure(&inner)?;
        let Some(row) = inner.rows.get_mut(&id.get()) else {
            return Ok(0);
        };
        match (field, value) {
            (ProfileField::Login, FieldValue::Text(s)) => row.login = s.clone(),
            (ProfileField::Name, FieldValue::Text(s)) => row.name = s.clone(),
            (ProfileField::Level, FieldValue::Int(n)) => row.level = *n,
            (field, value) => {
                return Err(AppError::integrity(format!(
                    "field '{field}' does not accept {} values",
                    value.kind()
                )));
            }
        }
        Ok(1)
    }

    async fn update_password(&self, id: UserId, digest: Option<&str>) -> AppResult<u64> {
        let mut inner = self.state.write().await;
        self.ensure(&inner)?;
        let Some(row) = inner.rows.get_mut(&id.get()) else {
            return Ok(0);
        };
        row.passwd = digest.map(String::from);
        Ok(1)
    }

    async fn update_session(
        &self,
        id: UserId,
        token: Option<&str>,
        expires_at: Option<&str>,
    ) -> AppResult<u64> {
        let mut inner = self.state.write().await;
        self.ensure(&inner)?;
        let Some(row) = inner.rows.get_mut(&id.get()) else {
            return Ok(0);
        };
        row.session = token.map(String::from);
        row.session_exp = expires_at.map(String::from);
        Ok(1)
    }

    async fn delete(&self, id: UserId) -> AppResult<u64> {
        let mut inner = self.state.write().await;
        self.ensure(&inner)?;
        Ok(if inner.rows.remove(&id.get()).is_some() {
            1
        } else {
            0
        })
    }
}
