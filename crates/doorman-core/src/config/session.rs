//! Session authenticator configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Session authenticator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in minutes. Each successful login or session
    /// check moves the expiry to now + this duration.
    #[serde(default = "default_duration")]
    pub duration_minutes: i64,
    /// Privilege threshold for `is_admin` on a bound identity.
    #[serde(default = "default_admin_level")]
    pub admin_level: i64,
}

impl SessionConfig {
    /// Validate the session duration and privilege threshold.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.duration_minutes < 1 {
            return Err(AppError::configuration(
                "session.duration_minutes must be a positive number of minutes",
            ));
        }
        if self.admin_level < 0 {
            return Err(AppError::configuration(
                "session.admin_level must be non-negative",
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_minutes: default_duration(),
            admin_level: default_admin_level(),
        }
    }
}

fn default_duration() -> i64 {
    30
}

fn default_admin_level() -> i64 {
    1
}
