use thiserror::Error;

/// Process-level error for binaries and start-up code.
///
/// Service crates keep their own error enums; this type covers the failures
/// that happen around them (configuration, binding sockets, storage bootstrap).
#[derive(Error, Debug)]
pub enum ClinicError {
    /// Network communication errors
    #[error("Network error: {0}")]
    NetworkError(String),

    /// HTTP server runtime errors
    #[error("Server error: {0}")]
    ServerError(String),

    /// Database bootstrap errors (pool creation, migrations)
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClinicError {
    /// Short machine-readable category, used as a structured log field.
    pub fn error_type(&self) -> &'static str {
        match self {
            ClinicError::NetworkError(_) => "network_error",
            ClinicError::ServerError(_) => "server_error",
            ClinicError::DatabaseError(_) => "database_error",
            ClinicError::ConfigError(_) => "configuration_error",
            ClinicError::InternalError(_) | ClinicError::Other(_) => "internal_error",
        }
    }
}

/// Result type alias for process-level operations
pub type Result<T> = std::result::Result<T, ClinicError>;

/// Log an error with its category attached
pub fn log_error(context: &str, error: &ClinicError) {
    tracing::error!(
        context = context,
        error_type = error.error_type(),
        error = %error,
        "Clinic engine error occurred"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_type_is_stable_per_variant() {
        assert_eq!(ClinicError::ConfigError("x".into()).error_type(), "configuration_error");
        assert_eq!(ClinicError::DatabaseError("x".into()).error_type(), "database_error");
        let wrapped: ClinicError = anyhow::anyhow!("boom").into();
        assert_eq!(wrapped.error_type(), "internal_error");
        assert_eq!(wrapped.to_string(), "boom");
    }
}
