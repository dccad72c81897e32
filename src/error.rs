use log::error;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    #[serde(rename = "not_found")]
    NotFound,
    #[serde(rename = "conflict")]
    Conflict,
    #[serde(rename = "already_exists")]
    AlreadyExists,
    #[serde(rename = "storage_unavailable")]
    Storage,
}

/// `NotFound` covers both "row is absent" and "row is not visible to the
/// caller", so that existence of a design can not be probed through errors.
#[derive(Serialize, Debug)]
pub struct StoreError {
    pub code: ErrorCode,
    pub message: String,
}

impl StoreError {
    pub fn not_found(msg: &str) -> Self {
        Self {
            code: ErrorCode::NotFound,
            message: msg.to_string(),
        }
    }
    pub fn conflict(msg: &str) -> Self {
        Self {
            code: ErrorCode::Conflict,
            message: msg.to_string(),
        }
    }
    pub fn already_exists(msg: &str) -> Self {
        Self {
            code: ErrorCode::AlreadyExists,
            message: msg.to_string(),
        }
    }
    pub fn storage(msg: &str) -> Self {
        Self {
            code: ErrorCode::Storage,
            message: msg.to_string(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for StoreError {}

/// Utility function for wrapping any backing-store failure, keeping the
/// original cause in the message.
pub fn storage_error<E>(err: E) -> StoreError
where
    E: std::fmt::Display,
{
    error!("storage error: {}", err);
    StoreError::storage(&err.to_string())
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match err {
            Error::NotFound => StoreError::not_found("Not found"),
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::already_exists(info.message())
            }
            err => storage_error(err),
        }
    }
}
