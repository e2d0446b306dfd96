//! Echo persistence contracts and store adapters.
//!
//! # Responsibility
//! - Define the backend-agnostic `EchoRepository` boundary.
//! - Map every backend failure into one store error taxonomy.
//!
//! # Invariants
//! - Write paths call `Echo::validate()` before touching storage.
//! - `list_echoes` returns records newest first (`created_at DESC`, ties
//!   broken by latest insertion).
//! - Adapters never mutate or delete existing records.

use crate::db::DbError;
use crate::model::echo::{Echo, EchoId, EchoValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod kv;
pub mod sqlite;
pub mod tiered;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure taxonomy shared by all store tiers.
#[derive(Debug)]
pub enum StoreError {
    /// Backend could not be reached or refused the operation.
    Connectivity(String),
    /// Persisted data could not be encoded or decoded.
    Serialization(String),
    /// Requested echo does not exist.
    NotFound(EchoId),
    /// Record failed write-path validation.
    Validation(EchoValidationError),
    /// Record id already exists in the target store.
    DuplicateId(EchoId),
}

impl StoreError {
    /// Whether the failure is caused by the record itself rather than the
    /// backend. Such failures are never retried on another tier.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::DuplicateId(_))
    }

    /// Stable code used in log lines and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connectivity(_) => "connectivity",
            Self::Serialization(_) => "serialization",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::DuplicateId(_) => "duplicate_id",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connectivity(message) => write!(f, "store unavailable: {message}"),
            Self::Serialization(message) => write!(f, "invalid echo data: {message}"),
            Self::NotFound(id) => write!(f, "echo not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateId(id) => write!(f, "echo already exists: {id}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EchoValidationError> for StoreError {
    fn from(value: EchoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Connectivity(value.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => {
                Self::Serialization(value.to_string())
            }
            other => Self::Connectivity(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

/// Backend-agnostic echo persistence boundary.
///
/// Implemented by the relational primary adapter, the on-device key-value
/// fallback adapter and the tiered store that composes them.
pub trait EchoRepository {
    /// Persists one complete echo and returns its id.
    fn create_echo(&self, echo: &Echo) -> StoreResult<EchoId>;
    /// Loads one echo by id.
    fn get_echo(&self, id: EchoId) -> StoreResult<Option<Echo>>;
    /// Lists all echoes owned by `user_id`, newest first.
    fn list_echoes(&self, user_id: &str) -> StoreResult<Vec<Echo>>;
}

impl<R: EchoRepository + ?Sized> EchoRepository for &R {
    fn create_echo(&self, echo: &Echo) -> StoreResult<EchoId> {
        (**self).create_echo(echo)
    }

    fn get_echo(&self, id: EchoId) -> StoreResult<Option<Echo>> {
        (**self).get_echo(id)
    }

    fn list_echoes(&self, user_id: &str) -> StoreResult<Vec<Echo>> {
        (**self).list_echoes(user_id)
    }
}
