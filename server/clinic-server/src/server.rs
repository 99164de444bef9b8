use appointment_service::{
    AppointmentConfig, AppointmentService, InMemoryAppointmentRepository, PostgresAppointmentRepository,
};
use error_common::ClinicError;
use ipd_service::{InMemoryIpdRepository, IpdConfig, IpdService, PostgresIpdRepository};
use khata_service::{InMemoryKhataRepository, KhataService, LedgerPolicy, PostgresKhataRepository};
use lab_service::{InMemoryLabRepository, LabService, PostgresLabRepository};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use tracing::info;

use crate::config::{ClinicConfig, StorageBackend};

/// Shared handler state
#[derive(Clone)]
pub struct ClinicServer {
    pub ipd: IpdService,
    pub khata: KhataService,
    pub appointments: AppointmentService,
    pub lab: LabService,
    /// Shown on statements and calendar entries
    pub clinic_name: Arc<str>,
}

impl ClinicServer {
    /// Build the server for the configured backend, running migrations when
    /// talking to Postgres
    pub async fn from_config(config: &ClinicConfig) -> Result<Self, ClinicError> {
        match config.database.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage; data is lost on restart");
                Ok(Self::in_memory(config))
            }
            StorageBackend::Postgres => {
                let url = config
                    .database
                    .url
                    .as_deref()
                    .ok_or_else(|| ClinicError::ConfigError("database.url is not set".to_string()))?;
                let pool = PgPoolOptions::new()
                    .max_connections(config.database.max_connections)
                    .connect(url)
                    .await
                    .map_err(|e| ClinicError::DatabaseError(format!("Failed to connect: {e}")))?;
                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .map_err(|e| ClinicError::DatabaseError(format!("Migration failed: {e}")))?;
                info!(max_connections = config.database.max_connections, "Connected to PostgreSQL");
                Ok(Self::postgres(config, pool))
            }
        }
    }

    pub fn in_memory(config: &ClinicConfig) -> Self {
        Self {
            ipd: IpdService::new(Arc::new(InMemoryIpdRepository::new()), ipd_config(config)),
            khata: KhataService::new(Arc::new(InMemoryKhataRepository::new()), ledger_policy(config)),
            appointments: AppointmentService::new(
                Arc::new(InMemoryAppointmentRepository::new()),
                appointment_config(config),
            ),
            lab: LabService::new(Arc::new(InMemoryLabRepository::new())),
            clinic_name: Arc::from(config.clinic.name.as_str()),
        }
    }

    pub fn postgres(config: &ClinicConfig, pool: PgPool) -> Self {
        Self {
            ipd: IpdService::new(Arc::new(PostgresIpdRepository::new(pool.clone())), ipd_config(config)),
            khata: KhataService::new(
                Arc::new(PostgresKhataRepository::new(pool.clone())),
                ledger_policy(config),
            ),
            appointments: AppointmentService::new(
                Arc::new(PostgresAppointmentRepository::new(pool.clone())),
                appointment_config(config),
            ),
            lab: LabService::new(Arc::new(PostgresLabRepository::new(pool))),
            clinic_name: Arc::from(config.clinic.name.as_str()),
        }
    }
}

fn ipd_config(config: &ClinicConfig) -> IpdConfig {
    IpdConfig {
        max_ward_capacity: config.ipd.max_ward_capacity,
    }
}

fn ledger_policy(config: &ClinicConfig) -> LedgerPolicy {
    LedgerPolicy {
        enforce_credit_limit: config.khata.enforce_credit_limit,
    }
}

fn appointment_config(config: &ClinicConfig) -> AppointmentConfig {
    AppointmentConfig {
        default_duration_minutes: config.appointments.default_duration_minutes,
    }
}
