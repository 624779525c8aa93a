//! End-user component: credential and session checks over one bound
//! identity.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use doorman_core::config::SessionConfig;
use doorman_core::error::AppError;
use doorman_core::result::AppResult;
use doorman_storage::{UserId, UserRow, UserStorage};

use crate::digest::{constant_time_eq, password_digest, session_token_at};
use crate::expiry::{compute_expiry, format_expiry, is_live};
use crate::log_failure;

/// Rejection message kept deliberately uniform across unknown-login,
/// disabled-account and wrong-password cases; the distinguishing detail
/// goes to the debug log only.
const LOGIN_REJECTION: &str = "invalid login or password";

const SESSION_REJECTION: &str = "invalid or expired session";

/// The record fields bound to an authenticator after a successful
/// check. A transient view: it is re-read from storage on every bind
/// and never written back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub id: UserId,
    pub login: String,
    pub name: String,
    pub level: i64,
    pub session: Option<String>,
    pub session_expiry: Option<String>,
}

impl From<UserRow> for Identity {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            login: row.login,
            name: row.name,
            level: row.level,
            session: row.session,
            session_expiry: row.session_exp,
        }
    }
}

/// A small state machine over one bound identity.
///
/// An instance is anonymous until a login or session check succeeds,
/// then identified until a check fails or the session ends. Every check
/// starts by dropping the current identity, so a failed check always
/// leaves the instance anonymous. All durable session state lives on
/// the storage row.
#[derive(Debug)]
pub struct SessionAuthenticator {
    storage: Arc<dyn UserStorage>,
    config: SessionConfig,
    identity: Option<Identity>,
}

impl SessionAuthenticator {
    /// Bind an authenticator to an already-provisioned table.
    pub async fn attach(
        storage: Arc<dyn UserStorage>,
        config: SessionConfig,
    ) -> AppResult<Self> {
        config.validate()?;
        storage
            .probe()
            .await
            .map_err(|e| log_failure("attach", e))?;
        Ok(Self {
            storage,
            config,
            identity: None,
        })
    }

    /// Authenticate by login and password, issuing a fresh session.
    ///
    /// On success a new token and expiry are written to the row in a
    /// single update, the record is re-read, and its fields are bound
    /// to this instance.
    pub async fn check_login(&mut self, login: &str, password: &str) -> AppResult<UserId> {
        self.authenticate(login, password, true).await
    }

    /// Authenticate without touching the session columns.
    ///
    /// Binds the identity exactly like [`check_login`](Self::check_login)
    /// but leaves whatever session the row currently carries in place.
    pub async fn verify_login(&mut self, login: &str, password: &str) -> AppResult<UserId> {
        self.authenticate(login, password, false).await
    }

    async fn authenticate(
        &mut self,
        login: &str,
        password: &str,
        issue_session: bool,
    ) -> AppResult<UserId> {
        self.identity = None;

        let row = self
            .storage
            .find_by_login(login)
            .await
            .map_err(|e| log_failure("check_login", e))?
            .ok_or_else(|| {
                debug!(login, "Login rejected: unknown login");
                AppError::rejected(LOGIN_REJECTION)
            })?;

        // An account without a digest is disabled outright, even
        // against an empty supplied password.
        let Some(stored) = row.passwd.as_deref().filter(|d| !d.is_empty()) else {
            debug!(login, user_id = %row.id, "Login rejected: account disabled");
            return Err(AppError::rejected(LOGIN_REJECTION));
        };

        let candidate = password_digest(password, row.id);
        if !constant_time_eq(candidate.as_bytes(), stored.as_bytes()) {
            debug!(login, user_id = %row.id, "Login rejected: digest mismatch");
            return Err(AppError::rejected(LOGIN_REJECTION));
        }

        let id = row.id;
        if issue_session {
            let now = Utc::now();
            let token = session_token_at(now);
            let expiry = format_expiry(compute_expiry(now, self.config.duration_minutes));
            let affected = self
                .storage
                .update_session(id, Some(&token), Some(&expiry))
                .await
                .map_err(|e| log_failure("check_login", e))?;
            if affected == 0 {
                // The row vanished between lookup and update.
                debug!(login, user_id = %id, "Login rejected: row disappeared");
                return Err(AppError::rejected(LOGIN_REJECTION));
            }
        }

        self.bind(id).await?;
        info!(user_id = %id, login, session = issue_session, "Login succeeded");
        Ok(id)
    }

    /// Authenticate by bearer token.
    ///
    /// A live session has its expiry pushed out to now plus the
    /// configured duration; the refreshed record is then re-read and
    /// bound. Empty, unknown, expired and malformed tokens are all
    /// rejected the same way.
    pub async fn check_session(&mut self, token: &str) -> AppResult<UserId> {
        self.identity = None;

        if token.is_empty() {
            debug!("Session rejected: empty token");
            return Err(AppError::rejected(SESSION_REJECTION));
        }

        let row = self
            .storage
            .find_by_session(token)
            .await
            .map_err(|e| log_failure("check_session", e))?
            .ok_or_else(|| {
                debug!("Session rejected: unknown token");
                AppError::rejected(SESSION_REJECTION)
            })?;

        let now = Utc::now();
        let live = row
            .session_exp
            .as_deref()
            .is_some_and(|encoded| is_live(encoded, now));
        if !live {
            debug!(user_id = %row.id, "Session rejected: expired or malformed expiry");
            return Err(AppError::rejected(SESSION_REJECTION));
        }

        let refreshed = format_expiry(compute_expiry(now, self.config.duration_minutes));
        let affected = self
            .storage
            .update_session(row.id, Some(token), Some(&refreshed))
            .await
            .map_err(|e| log_failure("check_session", e))?;
        if affected == 0 {
            debug!(user_id = %row.id, "Session rejected: row disappeared");
            return Err(AppError::rejected(SESSION_REJECTION));
        }

        let id = self.bind(row.id).await?;
        debug!(user_id = %id, "Session checked and refreshed");
        Ok(id)
    }

    /// Terminate the bound session: null both session columns on the
    /// row and drop back to anonymous.
    pub async fn end_session(&mut self) -> AppResult<()> {
        let Some(id) = self.identity.as_ref().map(|i| i.id) else {
            return Err(AppError::rejected("no session to end"));
        };

        let affected = self
            .storage
            .update_session(id, None, None)
            .await
            .map_err(|e| log_failure("end_session", e))?;
        if affected == 0 {
            debug!(user_id = %id, "Session row already gone");
        }
        self.identity = None;
        info!(user_id = %id, "Session ended");
        Ok(())
    }

    /// Change the bound user's own password. Requires an identity;
    /// admins change other accounts through the directory instead.
    pub async fn set_own_password(&mut self, plaintext: &str) -> AppResult<()> {
        let Some(id) = self.identity.as_ref().map(|i| i.id) else {
            return Err(AppError::rejected("not authenticated"));
        };
        if plaintext.is_empty() {
            return Err(AppError::integrity("password must not be empty"));
        }

        let digest = password_digest(plaintext, id);
        let affected = self
            .storage
            .update_password(id, Some(&digest))
            .await
            .map_err(|e| log_failure("set_own_password", e))?;
        if affected == 0 {
            self.identity = None;
            return Err(AppError::rejected(format!("no user with id {id}")));
        }
        info!(user_id = %id, "Credential changed by owner");
        Ok(())
    }

    /// Re-read the row and bind it as the current identity.
    async fn bind(&mut self, id: UserId) -> AppResult<UserId> {
        let row = self
            .storage
            .find_by_id(id)
            .await
            .map_err(|e| log_failure("bind", e))?
            .ok_or_else(|| AppError::rejected(format!("no user with id {id}")))?;
        let id = row.id;
        self.identity = Some(Identity::from(row));
        Ok(id)
    }

    /// Whether an identity is currently bound.
    pub fn is_identified(&self) -> bool {
        self.identity.is_some()
    }

    /// The bound identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Bound user id, absent while anonymous.
    pub fn id(&self) -> Option<UserId> {
        self.identity.as_ref().map(|i| i.id)
    }

    /// Bound login, absent while anonymous.
    pub fn login(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.login.as_str())
    }

    /// Bound display name, absent while anonymous.
    pub fn name(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.name.as_str())
    }

    /// Bound privilege level, absent while anonymous.
    pub fn level(&self) -> Option<i64> {
        self.identity.as_ref().map(|i| i.level)
    }

    /// Bound session token. Absent while anonymous, and after a
    /// [`verify_login`](Self::verify_login) against a row with no open
    /// session.
    pub fn session(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|i| i.session.as_deref())
    }

    /// Bound session expiry string, absent when no session is open.
    pub fn session_expiry(&self) -> Option<&str> {
        self.identity
            .as_ref()
            .and_then(|i| i.session_expiry.as_deref())
    }

    /// Whether the bound identity's level meets the configured
    /// privilege threshold. `false` while anonymous.
    pub fn is_admin(&self) -> bool {
        self.identity
            .as_ref()
            .is_some_and(|i| i.level >= self.config.admin_level)
    }
}
