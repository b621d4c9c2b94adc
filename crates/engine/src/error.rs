//! The module contains the errors the engine can throw.
//!
//! The errors are grouped by how callers should react:
//!
//! - [`KeyNotFound`] / [`ExistingKey`]: the referenced row is missing or a
//!   natural key is already taken.
//! - [`Forbidden`]: the caller tried to reach outside its own organizer scope.
//!   Always fatal, nothing is written.
//! - [`InvalidAmount`], [`InvalidSession`], [`InvalidPayment`]: input
//!   validation failures.
//! - [`InvalidArchive`]: a backup archive could not be parsed at all.
//! - [`Database`]: the store reported an error; its message is surfaced
//!   verbatim.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidSession`]: EngineError::InvalidSession
//!  [`InvalidPayment`]: EngineError::InvalidPayment
//!  [`InvalidArchive`]: EngineError::InvalidArchive
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid session: {0}")]
    InvalidSession(String),
    #[error("Invalid payment: {0}")]
    InvalidPayment(String),
    #[error("Player \"{0}\" has session or payment history")]
    PlayerHasHistory(String),
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidSession(a), Self::InvalidSession(b)) => a == b,
            (Self::InvalidPayment(a), Self::InvalidPayment(b)) => a == b,
            (Self::PlayerHasHistory(a), Self::PlayerHasHistory(b)) => a == b,
            (Self::InvalidArchive(a), Self::InvalidArchive(b)) => a == b,
            (Self::Cancelled(a), Self::Cancelled(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            (Self::Json(a), Self::Json(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
