//! Storage backend configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Storage backend configuration.
///
/// The table name ends up interpolated into SQL text (it cannot be a
/// bind parameter), so it is validated as a bare identifier before any
/// statement is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database connection URL, e.g. `sqlite://doorman.db` or
    /// `sqlite::memory:`.
    pub url: String,
    /// Name of the user table.
    #[serde(default = "default_table")]
    pub table: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl StorageConfig {
    /// Validate connection settings and the table identifier.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.url.is_empty() {
            return Err(AppError::configuration("storage.url must not be empty"));
        }
        if self.max_connections == 0 {
            return Err(AppError::configuration(
                "storage.max_connections must be at least 1",
            ));
        }
        validate_table_name(&self.table)
    }
}

/// Check that a table name is a bare SQL identifier.
///
/// Accepts `[A-Za-z_][A-Za-z0-9_]*` up to 64 bytes. Quoting, dots,
/// whitespace, and the empty string are all refused so the name can be
/// spliced into statements without escaping concerns.
pub fn validate_table_name(name: &str) -> Result<(), AppError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .bytes()
            .enumerate()
            .all(|(i, b)| b == b'_' || b.is_ascii_alphabetic() || (i > 0 && b.is_ascii_digit()));

    if valid {
        Ok(())
    } else {
        Err(AppError::configuration(format!(
            "invalid table name '{name}': expected a bare SQL identifier"
        )))
    }
}

fn default_table() -> String {
    "users".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(validate_table_name("users").is_ok());
        assert!(validate_table_name("_accounts_2").is_ok());
        assert!(validate_table_name("UserTable").is_ok());
    }

    #[test]
    fn rejects_non_identifiers() {
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1users").is_err());
        assert!(validate_table_name("users; DROP TABLE users").is_err());
        assert!(validate_table_name("sch.users").is_err());
        assert!(validate_table_name("use rs").is_err());
        assert!(validate_table_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn validate_flags_bad_settings() {
        let mut cfg = StorageConfig {
            url: "sqlite::memory:".to_string(),
            table: "users".to_string(),
            max_connections: 1,
            connect_timeout_seconds: 10,
        };
        assert!(cfg.validate().is_ok());

        cfg.max_connections = 0;
        assert!(cfg.validate().is_err());

        cfg.max_connections = 1;
        cfg.url.clear();
        assert!(cfg.validate().is_err());
    }
}
