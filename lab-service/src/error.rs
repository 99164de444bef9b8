use error_common::codes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Deliberately vague: lookups never reveal which credential was wrong
    #[error("Lab result not found")]
    NotFound,

    #[error("Order number {0} already exists")]
    DuplicateOrder(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LabError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> Option<&'static str> {
        match self {
            LabError::Validation(_) => Some(codes::validation::INVALID_FORMAT),
            LabError::DuplicateOrder(_) => Some(codes::lab::DUPLICATE_ORDER_NUMBER),
            LabError::Database(_) => Some(codes::database::QUERY_FAILED),
            LabError::NotFound | LabError::Storage(_) => None,
        }
    }
}

pub type LabResult<T> = Result<T, LabError>;
