//! Layered server configuration
//!
//! Sources, later ones winning: built-in defaults, an optional YAML file,
//! then `CLINIC__*` environment variables (`CLINIC__DATABASE__URL`,
//! `CLINIC__KHATA__ENFORCE_CREDIT_LIMIT`, ...).

use config::{Config, Environment, File};
use error_common::ClinicError;
use logger_redacted::LoggerConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local state, lost on restart
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub backend: StorageBackend,
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KhataSettings {
    pub enforce_credit_limit: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpdSettings {
    pub max_ward_capacity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentSettings {
    pub default_duration_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClinicSettings {
    /// Shown on statements and calendar entries
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClinicConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub logging: LoggerConfig,
    pub khata: KhataSettings,
    pub ipd: IpdSettings,
    pub appointments: AppointmentSettings,
    pub clinic: ClinicSettings,
}

impl ClinicConfig {
    /// Load configuration; a missing file is not an error
    pub fn load(path: &str) -> Result<Self, ClinicError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")
            .and_then(|b| b.set_default("server.port", 8080))
            .and_then(|b| b.set_default("database.backend", "memory"))
            .and_then(|b| b.set_default("database.max_connections", 10))
            .and_then(|b| b.set_default("logging.format", "pretty"))
            .and_then(|b| b.set_default("logging.level", "info"))
            .and_then(|b| b.set_default("khata.enforce_credit_limit", true))
            .and_then(|b| b.set_default("ipd.max_ward_capacity", 500))
            .and_then(|b| b.set_default("appointments.default_duration_minutes", 15))
            .and_then(|b| b.set_default("clinic.name", "Sewa Clinic"))
            .map_err(config_error)?;

        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path));
        }

        let config: Self = builder
            .add_source(Environment::with_prefix("CLINIC").separator("__"))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ClinicError> {
        if self.database.backend == StorageBackend::Postgres && self.database.url.is_none() {
            return Err(ClinicError::ConfigError(
                "database.url is required for the postgres backend".to_string(),
            ));
        }
        if self.ipd.max_ward_capacity <= 0 {
            return Err(ClinicError::ConfigError("ipd.max_ward_capacity must be positive".to_string()));
        }
        if self.appointments.default_duration_minutes <= 0 {
            return Err(ClinicError::ConfigError(
                "appointments.default_duration_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseSettings {
                backend: StorageBackend::Memory,
                url: None,
                max_connections: 10,
            },
            logging: LoggerConfig::default(),
            khata: KhataSettings {
                enforce_credit_limit: true,
            },
            ipd: IpdSettings { max_ward_capacity: 500 },
            appointments: AppointmentSettings {
                default_duration_minutes: 15,
            },
            clinic: ClinicSettings {
                name: "Sewa Clinic".to_string(),
            },
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn config_error(err: config::ConfigError) -> ClinicError {
    ClinicError::ConfigError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        let config = ClinicConfig::load("does-not-exist.yaml").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert!(config.khata.enforce_credit_limit);
        assert_eq!(config.ipd.max_ward_capacity, 500);
        assert_eq!(config.appointments.default_duration_minutes, 15);
    }

    #[test]
    fn postgres_backend_needs_a_url() {
        let mut config = ClinicConfig::default();
        config.database.backend = StorageBackend::Postgres;
        assert!(config.validate().is_err());
        config.database.url = Some("postgres://localhost/clinic".to_string());
        assert!(config.validate().is_ok());
    }
}
