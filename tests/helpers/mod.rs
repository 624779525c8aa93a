//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::EnvFilter;

use doorman::config::{DirectoryConfig, SessionConfig};
use doorman::{
    MemoryStorage, SchemaMode, SessionAuthenticator, SqliteStorage, UserDirectory, UserId,
    UserRow, UserStorage,
};

/// One backend plus the components under test, provisioned per test.
pub struct TestBed {
    pub storage: Arc<dyn UserStorage>,
}

impl TestBed {
    /// In-memory SQLite with a constrained `users` table.
    pub async fn sqlite() -> Self {
        let bed = Self::sqlite_bare().await;
        bed.storage
            .provision(SchemaMode::Constrained)
            .await
            .expect("provision users table");
        bed
    }

    /// In-memory SQLite with no table provisioned yet.
    pub async fn sqlite_bare() -> Self {
        init_tracing();
        // A pooled `:memory:` database must stay on one long-lived
        // connection or every checkout sees a fresh empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("open in-memory sqlite");
        let storage: Arc<dyn UserStorage> =
            Arc::new(SqliteStorage::from_pool(pool, "users").expect("valid table name"));
        Self { storage }
    }

    /// Map-backed storage with a permissive `users` table.
    pub async fn memory() -> Self {
        init_tracing();
        let storage: Arc<dyn UserStorage> =
            Arc::new(MemoryStorage::new("users").expect("valid table name"));
        storage
            .provision(SchemaMode::Permissive)
            .await
            .expect("provision users table");
        Self { storage }
    }

    /// Administrative component attached to the bed's table.
    pub async fn directory(&self) -> UserDirectory {
        self.directory_with(directory_config(1)).await
    }

    pub async fn directory_with(&self, config: DirectoryConfig) -> UserDirectory {
        UserDirectory::attach(self.storage.clone(), config)
            .await
            .expect("attach directory")
    }

    /// End-user component attached to the bed's table.
    pub async fn authenticator(&self) -> SessionAuthenticator {
        self.authenticator_with(session_config(30)).await
    }

    pub async fn authenticator_with(&self, config: SessionConfig) -> SessionAuthenticator {
        SessionAuthenticator::attach(self.storage.clone(), config)
            .await
            .expect("attach authenticator")
    }

    /// Create an account through the directory, with a derived display
    /// name.
    pub async fn create_user(&self, login: &str, password: &str, level: i64) -> UserId {
        self.directory()
            .await
            .create_user(login, &format!("Test {login}"), password, level)
            .await
            .expect("create user")
    }

    /// Peek at the raw row behind an id.
    pub async fn row(&self, id: UserId) -> Option<UserRow> {
        self.storage.find_by_id(id).await.expect("fetch row")
    }
}

pub fn session_config(duration_minutes: i64) -> SessionConfig {
    SessionConfig {
        duration_minutes,
        admin_level: 1,
    }
}

pub fn directory_config(admin_level: i64) -> DirectoryConfig {
    DirectoryConfig { admin_level }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
