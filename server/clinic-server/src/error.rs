use appointment_service::AppointmentError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use error_common::codes;
use ipd_service::IpdError;
use khata_service::KhataError;
use lab_service::LabError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Standard API error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error category, e.g. `conflict`
    pub error_type: String,
    /// Stable code when one applies (`SLOT_UNAVAILABLE`), otherwise the category
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable error message
    pub message: String,
    /// Timestamp when error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Suggested actions for resolving the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Standard API success response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

/// Response metadata for list endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<i64>,
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {message}")]
    Validation {
        code: Option<&'static str>,
        message: String,
    },

    /// The caller has no verified clinic attached
    #[error("No verified clinic for this request")]
    NoClinic,

    #[error("Resource not found: {resource_type}")]
    NotFound { resource_type: String },

    #[error("Resource conflict: {message}")]
    Conflict { code: &'static str, message: String },

    #[error("Unprocessable entity: {message}")]
    UnprocessableEntity { code: &'static str, message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Create a simple validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: Some(codes::validation::INVALID_INPUT),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource_type: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NoClinic | ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Database(sqlx::Error::PoolTimedOut) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::NoClinic | ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::UnprocessableEntity { .. } => "unprocessable_entity",
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Database(_) => "database_error",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    /// Stable code clients switch on
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Validation { code, .. } => *code,
            ApiError::NoClinic => Some(codes::clinic::NO_CLINIC),
            ApiError::Conflict { code, .. } | ApiError::UnprocessableEntity { code, .. } => Some(*code),
            ApiError::Database(_) => Some(codes::database::QUERY_FAILED),
            ApiError::NotFound { .. } | ApiError::BadRequest { .. } | ApiError::Internal { .. } => None,
        }
    }

    /// Get suggested actions for resolving the error
    pub fn suggestions(&self) -> Option<Vec<String>> {
        match self {
            ApiError::NoClinic => Some(vec![
                "Send the x-clinic-id header of a verified clinic".to_string(),
            ]),
            ApiError::Conflict { code, .. } if *code == codes::ipd::SLOT_UNAVAILABLE => Some(vec![
                "Refresh availability and pick another slot".to_string(),
            ]),
            ApiError::Database(_) => Some(vec![
                "Try again in a few moments".to_string(),
                "Contact support if the issue persists".to_string(),
            ]),
            _ => None,
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Database(sqlx::Error::RowNotFound) => "Requested record not found.".to_string(),
            ApiError::Database(_) => "Database operation failed. Please try again.".to_string(),
            ApiError::Internal { .. } => "An unexpected error occurred.".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                code = self.code().unwrap_or("-"),
                status_code = %status_code.as_u16(),
                "Request rejected"
            );
        }

        let code = self.code();
        let error_response = ApiErrorResponse {
            error_id,
            error_type: self.error_type().to_string(),
            error: code.unwrap_or(self.error_type()).to_string(),
            code: code.map(str::to_string),
            message: self.public_message(),
            timestamp: chrono::Utc::now(),
            suggestions: self.suggestions(),
        };

        (status_code, Json(error_response)).into_response()
    }
}

impl From<IpdError> for ApiError {
    fn from(err: IpdError) -> Self {
        let code = err.code();
        match err {
            IpdError::Validation(message) => ApiError::Validation { code, message },
            IpdError::NotFound(resource_type) => ApiError::NotFound { resource_type },
            IpdError::Conflict { code, message } => ApiError::Conflict { code, message },
            IpdError::InvalidTransition { .. } => ApiError::Conflict {
                code: codes::ipd::INVALID_BED_TRANSITION,
                message: err.to_string(),
            },
            IpdError::Database(e) => ApiError::Database(e),
            IpdError::Storage(message) => ApiError::Internal { message },
        }
    }
}

impl From<KhataError> for ApiError {
    fn from(err: KhataError) -> Self {
        let code = err.code();
        match err {
            KhataError::Validation(message) => ApiError::Validation { code, message },
            KhataError::NotFound(resource_type) => ApiError::NotFound { resource_type },
            KhataError::Overpayment { .. } => ApiError::UnprocessableEntity {
                code: codes::khata::OVERPAYMENT,
                message: err.to_string(),
            },
            KhataError::LimitExceeded { .. } => ApiError::Conflict {
                code: codes::khata::CREDIT_LIMIT_EXCEEDED,
                message: err.to_string(),
            },
            KhataError::AccountInactive => ApiError::Conflict {
                code: codes::khata::ACCOUNT_INACTIVE,
                message: err.to_string(),
            },
            KhataError::Database(e) => ApiError::Database(e),
            KhataError::Storage(message) => ApiError::Internal { message },
        }
    }
}

impl From<AppointmentError> for ApiError {
    fn from(err: AppointmentError) -> Self {
        let code = err.code();
        match err {
            AppointmentError::Validation(message) => ApiError::Validation { code, message },
            AppointmentError::NotFound(resource_type) => ApiError::NotFound { resource_type },
            AppointmentError::Conflict { code, message } => ApiError::Conflict { code, message },
            AppointmentError::Database(e) => ApiError::Database(e),
            AppointmentError::Storage(message) => ApiError::Internal { message },
        }
    }
}

impl From<LabError> for ApiError {
    fn from(err: LabError) -> Self {
        let code = err.code();
        match err {
            LabError::Validation(message) => ApiError::Validation { code, message },
            LabError::NotFound => ApiError::not_found("lab result"),
            LabError::DuplicateOrder(_) => ApiError::Conflict {
                code: codes::lab::DUPLICATE_ORDER_NUMBER,
                message: err.to_string(),
            },
            LabError::Database(e) => ApiError::Database(e),
            LabError::Storage(message) => ApiError::Internal { message },
        }
    }
}

/// Helper function to create successful API responses
pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: None,
    }
}

/// Successful list response carrying its item count
pub fn api_list<T>(items: Vec<T>) -> ApiResponse<Vec<T>> {
    let total_count = i64::try_from(items.len()).ok();
    ApiResponse {
        success: true,
        data: items,
        metadata: Some(ResponseMetadata { total_count }),
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn domain_conflicts_keep_their_codes() {
        let err: ApiError = IpdError::conflict(codes::ipd::SLOT_UNAVAILABLE, "bed is occupied").into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), Some("SLOT_UNAVAILABLE"));

        let err: ApiError = KhataError::Overpayment {
            amount: Decimal::new(500, 0),
            balance: Decimal::new(100, 0),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), Some("OVERPAYMENT"));
    }

    #[test]
    fn no_clinic_is_a_404_with_code() {
        assert_eq!(ApiError::NoClinic.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NoClinic.code(), Some("NO_CLINIC"));
    }

    #[test]
    fn lab_misses_are_plain_not_found() {
        let err: ApiError = LabError::NotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), None);
    }

    #[test]
    fn database_details_are_not_exposed() {
        let err = ApiError::Database(sqlx::Error::Protocol("relation beds does not exist".to_string()));
        assert!(!err.public_message().contains("beds"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
