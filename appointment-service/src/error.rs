use error_common::codes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict ({code}): {message}")]
    Conflict { code: &'static str, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppointmentError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn slot_unavailable(message: impl Into<String>) -> Self {
        Self::Conflict {
            code: codes::appointments::SLOT_UNAVAILABLE,
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        match self {
            AppointmentError::Validation(_) => Some(codes::validation::INVALID_INPUT),
            AppointmentError::Conflict { code, .. } => Some(*code),
            AppointmentError::Database(_) => Some(codes::database::QUERY_FAILED),
            AppointmentError::NotFound(_) | AppointmentError::Storage(_) => None,
        }
    }
}

pub type AppointmentResult<T> = Result<T, AppointmentError>;
