//! Logging setup for the Sewa clinic engine with PII redaction
//!
//! Two responsibilities:
//!
//! - **Subscriber initialisation**: one call wires `tracing-subscriber` with an
//!   `EnvFilter` (honouring `RUST_LOG`) and either a human-readable or a JSON
//!   formatter, depending on [`LoggerConfig::format`].
//! - **Redaction**: customer phone numbers and email addresses must not reach
//!   log sinks in clear text. [`PiiRedactor`] replaces them with a short
//!   correlation hash so two log lines about the same customer still line up.
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{redact_phone, PiiRedactor};
//!
//! let masked = redact_phone("9841234567");
//! assert!(masked.starts_with("PHONE["));
//!
//! let line = PiiRedactor::default().redact("payment from 9841234567");
//! assert!(!line.contains("9841234567"));
//! ```

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use lazy_static::lazy_static;
use thiserror::Error;
use tracing_subscriber::{fmt, fmt::time::ChronoUtc, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

lazy_static! {
    static ref DEFAULT_REDACTOR: PiiRedactor = PiiRedactor::default();
}

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Install the global tracing subscriber.
///
/// `default_directives` is used when `RUST_LOG` is not set, e.g.
/// `"clinic_server=info,ipd_service=info,tower_http=info"`.
pub fn init_tracing(config: &LoggerConfig, default_directives: &str) -> Result<(), LoggerError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives).map_err(|e| LoggerError::InvalidFilter(e.to_string()))?,
    };

    match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    }
    .map_err(|e| LoggerError::Init(e.to_string()))
}

/// Redact free text with the default redaction rules.
pub fn redact(text: &str) -> String {
    DEFAULT_REDACTOR.redact(text)
}

/// Mask a phone number for use as a structured log field.
pub fn redact_phone(phone: &str) -> String {
    DEFAULT_REDACTOR.redact_phone_field(phone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_redaction_hashes_phone_numbers() {
        let out = redact("customer 9812345678 owes");
        assert!(out.contains("PHONE["));
        assert!(!out.contains("9812345678"));
    }

    #[test]
    fn default_config_is_pretty_info() {
        let config = LoggerConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.level, "info");
    }
}
