//! The module contains the error the engine can throw.
//!
//! The errors follow a small taxonomy shared with every caller:
//!
//! - [`Invalid`] malformed or non-positive input.
//! - [`NotFound`] missing (or soft-deleted) company, entry type, entry or deed.
//! - [`Unauthorized`] missing capability or foreign ownership.
//! - [`Conflict`] not enough quantity; carries a per-id shortfall.
//! - [`Database`] infrastructure failure.
//!
//!  [`Invalid`]: EngineError::Invalid
//!  [`NotFound`]: EngineError::NotFound
//!  [`Unauthorized`]: EngineError::Unauthorized
//!  [`Conflict`]: EngineError::Conflict
//!  [`Database`]: EngineError::Database
use std::collections::BTreeMap;

use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::Quantity;

/// Missing quantity keyed by entry id (explicit distributions) or entry type
/// id (planned distributions).
pub type Shortfall = BTreeMap<Uuid, Quantity>;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid: {0}")]
    Invalid(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Conflict: {message}")]
    Conflict { message: String, shortfall: Shortfall },
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Stable error code, suitable for the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Invalid,
    NotFound,
    Conflict,
    Unauthorized,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::Internal => "internal",
        }
    }
}

impl EngineError {
    pub(crate) fn conflict(message: impl Into<String>, shortfall: Shortfall) -> Self {
        Self::Conflict {
            message: message.into(),
            shortfall,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid(_) => ErrorKind::Invalid,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable shortfall, if any.
    pub fn shortfall(&self) -> Option<&Shortfall> {
        match self {
            Self::Conflict { shortfall, .. } => Some(shortfall),
            _ => None,
        }
    }

    /// Message safe to show outside the process.
    ///
    /// Database errors are logged and replaced with a generic message.
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(db_err) => {
                tracing::error!("database error: {db_err}");
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Invalid(a), Self::Invalid(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (
                Self::Conflict {
                    message: a,
                    shortfall: sa,
                },
                Self::Conflict {
                    message: b,
                    shortfall: sb,
                },
            ) => a == b && sa == sb,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_taxonomy() {
        assert_eq!(EngineError::Invalid("x".into()).kind().as_str(), "invalid");
        assert_eq!(EngineError::NotFound("x".into()).kind().as_str(), "not_found");
        assert_eq!(
            EngineError::Unauthorized("x".into()).kind().as_str(),
            "unauthorized"
        );
        assert_eq!(
            EngineError::conflict("x", Shortfall::new()).kind().as_str(),
            "conflict"
        );
        assert_eq!(
            EngineError::Database(DbErr::Custom("boom".into())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn database_errors_are_hidden() {
        let err = EngineError::Database(DbErr::Custom("secret dsn".into()));
        assert_eq!(err.public_message(), "internal error");
        assert!(err.shortfall().is_none());
    }

    #[test]
    fn conflict_exposes_shortfall() {
        let id = Uuid::new_v4();
        let err = EngineError::conflict(
            "not enough quantity",
            Shortfall::from([(id, Quantity::from_units(50))]),
        );
        assert_eq!(
            err.shortfall().and_then(|s| s.get(&id)).copied(),
            Some(Quantity::from_units(50))
        );
        assert_eq!(err.public_message(), "Conflict: not enough quantity");
    }
}
