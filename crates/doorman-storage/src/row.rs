//! User row entity and the typed view over its profile fields.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

/// Identifier of a user record.
///
/// Ids are assigned by the directory as `max(id) + 1` at creation time
/// and are never recycled while the row exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// One full row of the user table.
///
/// `passwd` holds the hex password digest, or nothing for a disabled
/// account. `session` and `session_exp` are always both present or both
/// absent; the components maintain that pairing on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: UserId,
    pub login: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub passwd: Option<String>,
    pub level: i64,
    pub session: Option<String>,
    pub session_exp: Option<String>,
}

impl UserRow {
    /// Whether the account can authenticate at all. A missing or empty
    /// digest disables the account.
    pub fn has_credential(&self) -> bool {
        self.passwd.as_deref().is_some_and(|d| !d.is_empty())
    }
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for UserRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: UserId(row.try_get("id")?),
            login: row.try_get("login")?,
            name: row.try_get("name")?,
            passwd: row.try_get("passwd")?,
            level: row.try_get("level")?,
            session: row.try_get("session")?,
            session_exp: row.try_get("session_exp")?,
        })
    }
}

/// Listing view of a row: everything except credentials and session
/// state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub login: String,
    pub name: String,
    pub level: i64,
}

impl From<UserRow> for UserSummary {
    fn from(row: UserRow) -> Self {
        Self {
            login: row.login,
            name: row.name,
            level: row.level,
        }
    }
}

/// The profile fields that can be read and written one at a time.
///
/// The closed set keeps field access compile-time checked; credentials
/// and session state move only through the dedicated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileField {
    Login,
    Name,
    Level,
}

impl ProfileField {
    /// Column name in the user table.
    pub fn column(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Name => "name",
            Self::Level => "level",
        }
    }

    /// Whether the value's type matches this field.
    pub fn accepts(self, value: &FieldValue) -> bool {
        match self {
            Self::Login | Self::Name => matches!(value, FieldValue::Text(_)),
            Self::Level => matches!(value, FieldValue::Int(_)),
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A dynamically typed profile value: text for `login`/`name`, an
/// integer for `level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int(i64),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Text(_) => None,
            Self::Int(n) => Some(*n),
        }
    }

    /// Short type name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Int(_) => "integer",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(passwd: Option<&str>) -> UserRow {
        UserRow {
            id: UserId(1),
            login: "alice".to_string(),
            name: "Alice".to_string(),
            passwd: passwd.map(String::from),
            level: 0,
            session: None,
            session_exp: None,
        }
    }

    #[test]
    fn text_fields_accept_text_only() {
        assert!(ProfileField::Login.accepts(&FieldValue::from("bob")));
        assert!(ProfileField::Name.accepts(&FieldValue::from("Bob")));
        assert!(!ProfileField::Login.accepts(&FieldValue::from(3)));
        assert!(!ProfileField::Name.accepts(&FieldValue::from(3)));
    }

    #[test]
    fn level_accepts_integers_only() {
        assert!(ProfileField::Level.accepts(&FieldValue::from(2)));
        assert!(!ProfileField::Level.accepts(&FieldValue::from("2")));
    }

    #[test]
    fn missing_or_empty_digest_means_no_credential() {
        assert!(!row(None).has_credential());
        assert!(!row(Some("")).has_credential());
        assert!(row(Some("abc123")).has_credential());
    }

    #[test]
    fn serialized_row_never_carries_the_digest() {
        let json = serde_json::to_string(&row(Some("secret-digest"))).unwrap();
        assert!(!json.contains("secret-digest"));
        assert!(json.contains("alice"));
    }
}
