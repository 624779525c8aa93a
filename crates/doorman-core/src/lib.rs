//! # doorman-core
//!
//! Core crate for Doorman. Contains configuration schemas and the
//! unified error system shared by the storage and auth crates.
//!
//! This crate has **no** internal dependencies on other Doorman crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
