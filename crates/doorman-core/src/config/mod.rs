//! Library configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Hosts embedding Doorman may also build the section structs
//! directly; `validate` is called by the component constructors either
//! way.

pub mod directory;
pub mod session;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use self::directory::DirectoryConfig;
pub use self::session::SessionConfig;
pub use self::storage::StorageConfig;

use crate::error::AppError;

/// Root configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Storage backend settings.
    pub storage: StorageConfig,
    /// Administrative directory settings.
    #[serde(default)]
    pub directory: DirectoryConfig,
    /// Session authenticator settings.
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific
    /// overlay and environment variables prefixed with `DOORMAN__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("DOORMAN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), AppError> {
        self.storage.validate()?;
        self.directory.validate()?;
        self.session.validate()?;
        Ok(())
    }
}
