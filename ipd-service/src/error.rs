use crate::models::BedStatus;
use error_common::codes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpdError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict ({code}): {message}")]
    Conflict { code: &'static str, message: String },

    #[error("Illegal bed status transition from {from} to {to}")]
    InvalidTransition { from: BedStatus, to: BedStatus },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IpdError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    /// Stable error code for API clients, when one applies
    pub fn code(&self) -> Option<&'static str> {
        match self {
            IpdError::Validation(_) => Some(codes::validation::INVALID_INPUT),
            IpdError::Conflict { code, .. } => Some(*code),
            IpdError::InvalidTransition { .. } => Some(codes::ipd::INVALID_BED_TRANSITION),
            IpdError::Database(_) => Some(codes::database::QUERY_FAILED),
            IpdError::NotFound(_) | IpdError::Storage(_) => None,
        }
    }

    /// Map unique-index violations raised by Postgres onto domain conflicts.
    pub(crate) fn from_unique_violation(err: sqlx::Error, code: &'static str, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => IpdError::conflict(code, message),
            _ => IpdError::Database(err),
        }
    }
}

pub type IpdResult<T> = Result<T, IpdError>;
