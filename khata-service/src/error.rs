use error_common::codes;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KhataError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Payment of {amount} exceeds the outstanding balance of {balance}")]
    Overpayment { amount: Decimal, balance: Decimal },

    #[error("Credit limit of {limit} exceeded: balance would become {attempted}")]
    LimitExceeded { limit: Decimal, attempted: Decimal },

    #[error("Credit account is inactive")]
    AccountInactive,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl KhataError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Stable error code for API clients, when one applies
    pub fn code(&self) -> Option<&'static str> {
        match self {
            KhataError::Validation(_) => Some(codes::validation::INVALID_INPUT),
            KhataError::Overpayment { .. } => Some(codes::khata::OVERPAYMENT),
            KhataError::LimitExceeded { .. } => Some(codes::khata::CREDIT_LIMIT_EXCEEDED),
            KhataError::AccountInactive => Some(codes::khata::ACCOUNT_INACTIVE),
            KhataError::Database(_) => Some(codes::database::QUERY_FAILED),
            KhataError::NotFound(_) | KhataError::Storage(_) => None,
        }
    }
}

pub type KhataResult<T> = Result<T, KhataError>;
