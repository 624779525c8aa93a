//! Administrative component: table lifecycle and account management.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use doorman_core::config::DirectoryConfig;
use doorman_core::error::AppError;
use doorman_core::result::AppResult;
use doorman_storage::{
    Atomicity, FieldValue, ProfileField, SchemaMode, UserId, UserRow, UserStorage, UserSummary,
};

use crate::digest::password_digest;
use crate::expiry;
use crate::log_failure;

/// Administrative view over the user table.
///
/// Construction goes through [`provision`](Self::provision) (create the
/// table) or [`attach`](Self::attach) (probe an existing one), so a
/// live directory implies a usable schema. Nothing is cached: every
/// accessor is a point query against storage.
#[derive(Debug)]
pub struct UserDirectory {
    storage: Arc<dyn UserStorage>,
    config: DirectoryConfig,
}

impl UserDirectory {
    /// Create the backing table in the requested mode and bind to it.
    pub async fn provision(
        storage: Arc<dyn UserStorage>,
        mode: SchemaMode,
        config: DirectoryConfig,
    ) -> AppResult<Self> {
        config.validate()?;
        storage
            .provision(mode)
            .await
            .map_err(|e| log_failure("provision", e))?;
        info!(table = storage.table(), ?mode, "User table provisioned");
        Ok(Self { storage, config })
    }

    /// Bind to an existing table, probing that it has the expected
    /// columns.
    pub async fn attach(
        storage: Arc<dyn UserStorage>,
        config: DirectoryConfig,
    ) -> AppResult<Self> {
        config.validate()?;
        storage
            .probe()
            .await
            .map_err(|e| log_failure("attach", e))?;
        Ok(Self { storage, config })
    }

    /// Full scan of all accounts, keyed by id.
    ///
    /// Fails outright when the scan cannot run; never returns partial
    /// data.
    pub async fn list_users(&self) -> AppResult<BTreeMap<UserId, UserSummary>> {
        let rows = self
            .storage
            .find_all()
            .await
            .map_err(|e| log_failure("list_users", e))?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                (id, UserSummary::from(row))
            })
            .collect())
    }

    /// Resolve a login to its id, `None` when no account carries it.
    pub async fn lookup_id(&self, login: &str) -> AppResult<Option<UserId>> {
        let row = self
            .storage
            .find_by_login(login)
            .await
            .map_err(|e| log_failure("lookup_id", e))?;
        Ok(row.map(|r| r.id))
    }

    /// Read one profile field, `None` for an unknown id.
    pub async fn get_field(
        &self,
        id: UserId,
        field: ProfileField,
    ) -> AppResult<Option<FieldValue>> {
        let row = self
            .storage
            .find_by_id(id)
            .await
            .map_err(|e| log_failure("get_field", e))?;
        Ok(row.map(|r| match field {
            ProfileField::Login => FieldValue::Text(r.login),
            ProfileField::Name => FieldValue::Text(r.name),
            ProfileField::Level => FieldValue::Int(r.level),
        }))
    }

    /// Write one profile field.
    ///
    /// The value must match the field's type, and a login rename is
    /// refused when the new login already belongs to a different id.
    /// Both checks run before anything reaches storage, so a refused
    /// write leaves the table untouched.
    pub async fn set_field(
        &self,
        id: UserId,
        field: ProfileField,
        value: FieldValue,
    ) -> AppResult<()> {
        if !field.accepts(&value) {
            return Err(AppError::integrity(format!(
                "field '{field}' does not accept {} values",
                value.kind()
            )));
        }
        if field == ProfileField::Level && value.as_int().is_some_and(|level| level < 0) {
            return Err(AppError::integrity("level must be non-negative"));
        }
        if field == ProfileField::Login {
            if let Some(new_login) = value.as_text() {
                if new_login.is_empty() {
                    return Err(AppError::integrity("login must not be empty"));
                }
                if let Some(owner) = self.lookup_id(new_login).await? {
                    if owner != id {
                        return Err(AppError::integrity(format!(
                            "login '{new_login}' already belongs to user {owner}"
                        )));
                    }
                }
            }
        }

        let affected = self
            .storage
            .update_field(id, field, &value)
            .await
            .map_err(|e| log_failure("set_field", e))?;
        if affected == 0 {
            return Err(AppError::rejected(format!("no user with id {id}")));
        }
        debug!(user_id = %id, field = %field, "Profile field updated");
        Ok(())
    }

    /// Set or clear an account credential.
    ///
    /// The stored value is a digest of the plaintext and the id. An
    /// empty plaintext clears the digest, which disables authentication
    /// for the account entirely.
    pub async fn set_password(&self, id: UserId, plaintext: &str) -> AppResult<()> {
        let digest = (!plaintext.is_empty()).then(|| password_digest(plaintext, id));
        let affected = self
            .storage
            .update_password(id, digest.as_deref())
            .await
            .map_err(|e| log_failure("set_password", e))?;
        if affected == 0 {
            return Err(AppError::rejected(format!("no user with id {id}")));
        }
        info!(user_id = %id, disabled = digest.is_none(), "Credential updated");
        Ok(())
    }

    /// Create an account and return its id.
    ///
    /// Ids are assigned as `max(id) + 1`, which races under concurrent
    /// creation; callers needing a hard guarantee must serialize their
    /// calls. The insert and the credential write go through storage as
    /// one unit, transactional when the backend supports it. On a
    /// backend without transactions a warning notes that a failure can
    /// leave partial state behind.
    pub async fn create_user(
        &self,
        login: &str,
        name: &str,
        password: &str,
        level: i64,
    ) -> AppResult<UserId> {
        if login.is_empty() {
            return Err(AppError::integrity("login must not be empty"));
        }
        if level < 0 {
            return Err(AppError::integrity("level must be non-negative"));
        }
        if let Some(owner) = self.lookup_id(login).await? {
            return Err(AppError::integrity(format!(
                "login '{login}' already belongs to user {owner}"
            )));
        }

        let max = self
            .storage
            .max_id()
            .await
            .map_err(|e| log_failure("create_user", e))?;
        let id = UserId(max.map_or(1, |m| m.get() + 1));

        let row = UserRow {
            id,
            login: login.to_string(),
            name: name.to_string(),
            passwd: None,
            level,
            session: None,
            session_exp: None,
        };
        let digest = (!password.is_empty()).then(|| password_digest(password, id));

        if !self.storage.capabilities().transactions {
            warn!(
                user_id = %id,
                login,
                "Backend lacks transactions; a failure mid-creation can leave partial state"
            );
        }
        let atomicity = self
            .storage
            .create(&row, digest.as_deref())
            .await
            .map_err(|e| log_failure("create_user", e))?;

        info!(
            user_id = %id,
            login,
            level,
            atomic = matches!(atomicity, Atomicity::Transactional),
            "User created"
        );
        Ok(id)
    }

    /// Delete an account outright. Session state goes with the row.
    pub async fn remove_user(&self, id: UserId) -> AppResult<()> {
        let affected = self
            .storage
            .delete(id)
            .await
            .map_err(|e| log_failure("remove_user", e))?;
        if affected == 0 {
            return Err(AppError::rejected(format!("no user with id {id}")));
        }
        info!(user_id = %id, "User removed");
        Ok(())
    }

    /// Clear the session columns on every row whose session is stale.
    ///
    /// A session is stale when a token is present but the stored expiry
    /// is absent, malformed, or in the past. Rows that fail to update
    /// are logged and skipped. Returns the number of rows purged.
    pub async fn purge_expired_sessions(&self) -> AppResult<u64> {
        let rows = self
            .storage
            .find_all()
            .await
            .map_err(|e| log_failure("purge_expired_sessions", e))?;
        let now = Utc::now();
        let mut purged = 0u64;

        for row in rows {
            if row.session.is_none() {
                continue;
            }
            let live = row
                .session_exp
                .as_deref()
                .is_some_and(|encoded| expiry::is_live(encoded, now));
            if live {
                continue;
            }
            match self.storage.update_session(row.id, None, None).await {
                Ok(_) => purged += 1,
                Err(e) => {
                    error!(user_id = %row.id, error = %e, "Failed to purge stale session");
                }
            }
        }

        if purged > 0 {
            info!(purged, "Purged stale sessions");
        }
        Ok(purged)
    }

    /// Whether the user's level meets the configured privilege
    /// threshold.
    #[deprecated(note = "read the level and compare it to an explicit threshold")]
    pub async fn is_admin(&self, id: UserId) -> AppResult<bool> {
        let row = self
            .storage
            .find_by_id(id)
            .await
            .map_err(|e| log_failure("is_admin", e))?
            .ok_or_else(|| AppError::rejected(format!("no user with id {id}")))?;
        Ok(row.level >= self.config.admin_level)
    }

    /// Raise the user's level to the configured privilege threshold.
    #[deprecated(note = "set the level field to an explicit value")]
    pub async fn set_admin(&self, id: UserId) -> AppResult<()> {
        self.set_field(id, ProfileField::Level, FieldValue::Int(self.config.admin_level))
            .await
    }

    /// Reset the user's level to zero.
    #[deprecated(note = "set the level field to an explicit value")]
    pub async fn unset_admin(&self, id: UserId) -> AppResult<()> {
        self.set_field(id, ProfileField::Level, FieldValue::Int(0))
            .await
    }
}
