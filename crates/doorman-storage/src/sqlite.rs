//! SQLite adapter for the user table, built on sqlx.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use doorman_core::config::StorageConfig;
use doorman_core::config::storage::validate_table_name;
use doorman_core::error::{AppError, ErrorKind};
use doorman_core::result::AppResult;

use crate::backend::{Atomicity, SchemaMode, StorageCapabilities, UserStorage};
use crate::row::{FieldValue, ProfileField, UserId, UserRow};

const COLUMNS: &str = "id, login, name, passwd, level, session, session_exp";

/// SQLite-backed [`UserStorage`].
///
/// The table name is taken from configuration and validated as a plain
/// identifier before it is ever spliced into SQL; all values travel
/// through bind parameters.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
    table: String,
}

impl SqliteStorage {
    /// Open a connection pool from configuration.
    pub async fn connect(config: &StorageConfig) -> AppResult<Self> {
        config.validate()?;

        let mut options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds));

        // Every pooled connection to a `:memory:` URL opens its own
        // private database, so such pools are pinned to one long-lived
        // connection.
        if config.url.contains(":memory:") {
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options.connect(&config.url).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to connect to database at {}", config.url),
                e,
            )
        })?;

        info!(
            url = %config.url,
            table = %config.table,
            max_connections = config.max_connections,
            "Database connection established"
        );

        Ok(Self {
            pool,
            table: config.table.clone(),
        })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: SqlitePool, table: impl Into<String>) -> AppResult<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { pool, table })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trip a trivial query to verify the connection is alive.
    pub async fn health_check(&self) -> AppResult<()> {
        let one: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Database health check failed", e)
            })?;
        if one != 1 {
            return Err(AppError::storage("Database health check returned garbage"));
        }
        Ok(())
    }

    async fn fetch_one_by(&self, column: &str, bind: &str) -> AppResult<Option<UserRow>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} WHERE {column} = ?",
            self.table
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to fetch user by {column}"),
                    e,
                )
            })
    }
}

#[async_trait]
impl UserStorage for SqliteStorage {
    fn table(&self) -> &str {
        &self.table
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities {
            transactions: true,
            enforced_constraints: true,
        }
    }

    async fn provision(&self, mode: SchemaMode) -> AppResult<()> {
        let sql = match mode {
            SchemaMode::Constrained => format!(
                "CREATE TABLE {} (
                    id INTEGER PRIMARY KEY,
                    login TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    passwd TEXT,
                    level INTEGER NOT NULL,
                    session TEXT,
                    session_exp TEXT
                )",
                self.table
            ),
            SchemaMode::Permissive => format!(
                "CREATE TABLE {} (
                    id INTEGER,
                    login TEXT,
                    name TEXT,
                    passwd TEXT,
                    level INTEGER,
                    session TEXT,
                    session_exp TEXT
                )",
                self.table
            ),
        };

        sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Schema,
                format!("Failed to create table '{}'", self.table),
                e,
            )
        })?;

        info!(table = %self.table, ?mode, "User table created");
        Ok(())
    }

    async fn probe(&self) -> AppResult<()> {
        let sql = format!("SELECT {COLUMNS} FROM {} LIMIT 1", self.table);
        sqlx::query_as::<_, UserRow>(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Schema,
                    format!("Table '{}' is missing or malformed", self.table),
                    e,
                )
            })?;
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<UserRow>> {
        let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = ?", self.table);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to fetch user by id", e)
            })
    }

    async fn find_by_login(&self, login: &str) -> AppResult<Option<UserRow>> {
        self.fetch_one_by("login", login).await
    }

    async fn find_by_session(&self, token: &str) -> AppResult<Option<UserRow>> {
        self.fetch_one_by("session", token).await
    }

    async fn find_all(&self) -> AppResult<Vec<UserRow>> {
        let sql = format!("SELECT {COLUMNS} FROM {} ORDER BY id", self.table);
        sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to list users", e))
    }

    async fn max_id(&self) -> AppResult<Option<UserId>> {
        let sql = format!("SELECT MAX(id) FROM {}", self.table);
        let max: Option<i64> = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to determine max user id", e)
            })?;
        Ok(max.map(UserId))
    }

    async fn create(&self, row: &UserRow, digest: Option<&str>) -> AppResult<Atomicity> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to begin transaction", e)
        })?;

        let insert = format!(
            "INSERT INTO {} ({COLUMNS}) VALUES (?, ?, ?, NULL, ?, NULL, NULL)",
            self.table
        );
        sqlx::query(&insert)
            .bind(row.id.get())
            .bind(&row.login)
            .bind(&row.name)
            .bind(row.level)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AppError::integrity(format!(
                        "user id {} or login '{}' already exists",
                        row.id, row.login
                    ))
                }
                _ => AppError::with_source(ErrorKind::Storage, "Failed to insert user", e),
            })?;

        let update = format!("UPDATE {} SET passwd = ? WHERE id = ?", self.table);
        sqlx::query(&update)
            .bind(digest)
            .bind(row.id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to store credential", e)
            })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to commit user creation", e)
        })?;

        Ok(Atomicity::Transactional)
    }

    async fn update_field(
        &self,
        id: UserId,
        field: ProfileField,
        value: &FieldValue,
    ) -> AppResult<u64> {
        let sql = format!(
            "UPDATE {} SET {} = ? WHERE id = ?",
            self.table,
            field.column()
        );
        let query = sqlx::query(&sql);
        let query = match value {
            FieldValue::Text(s) => query.bind(s),
            FieldValue::Int(n) => query.bind(n),
        };
        let result = query
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AppError::integrity(format!("value '{value}' is already taken"))
                }
                _ => AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to update field '{field}'"),
                    e,
                ),
            })?;
        Ok(result.rows_affected())
    }

    async fn update_password(&self, id: UserId, digest: Option<&str>) -> AppResult<u64> {
        let sql = format!("UPDATE {} SET passwd = ? WHERE id = ?", self.table);
        let result = sqlx::query(&sql)
            .bind(digest)
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to update credential", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn update_session(
        &self,
        id: UserId,
        token: Option<&str>,
        expires_at: Option<&str>,
    ) -> AppResult<u64> {
        let sql = format!(
            "UPDATE {} SET session = ?, session_exp = ? WHERE id = ?",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(token)
            .bind(expires_at)
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to update session", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: UserId) -> AppResult<u64> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.table);
        let result = sqlx::query(&sql)
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to delete user", e))?;
        Ok(result.rows_affected())
    }
}
