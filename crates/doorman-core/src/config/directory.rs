//! Administrative directory configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Configuration for the administrative user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Privilege threshold used by the deprecated admin helpers: levels
    /// at or above this value are treated as privileged. Never stored on
    /// a record.
    #[serde(default = "default_admin_level")]
    pub admin_level: i64,
}

impl DirectoryConfig {
    /// Validate the privilege threshold.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.admin_level < 0 {
            return Err(AppError::configuration(
                "directory.admin_level must be non-negative",
            ));
        }
        Ok(())
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            admin_level: default_admin_level(),
        }
    }
}

fn default_admin_level() -> i64 {
    1
}
