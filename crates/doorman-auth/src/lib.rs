//! # doorman-auth
//!
//! The two Doorman components and the primitives they share.
//!
//! [`UserDirectory`] is the administrative side: it owns the table
//! lifecycle and account CRUD, and holds no per-user state.
//! [`SessionAuthenticator`] is the end-user side: credential and
//! session checks that bind one identity per instance. Both talk to
//! storage through the `UserStorage` contract and never cache rows.
//!
//! ## Modules
//!
//! - `digest` - salted password digests and token derivation
//! - `expiry` - the stored expiry codec and liveness rule
//! - `directory` - table lifecycle and account administration
//! - `authenticator` - login/session checks and the bound identity

pub mod authenticator;
pub mod digest;
pub mod directory;
pub mod expiry;

pub use authenticator::{Identity, SessionAuthenticator};
pub use directory::UserDirectory;

use doorman_core::error::{AppError, ErrorKind};

/// Escalate infrastructure failures to the error log on their way out;
/// semantic rejections keep their debug-level treatment at the call
/// site.
pub(crate) fn log_failure(op: &'static str, err: AppError) -> AppError {
    if matches!(err.kind, ErrorKind::Storage | ErrorKind::Schema) {
        tracing::error!(op, error = %err, "Storage operation failed");
    }
    err
}
