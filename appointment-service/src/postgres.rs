//! PostgreSQL-backed appointment repository
//!
//! Bookings for one doctor serialize on a transaction-scoped advisory lock
//! keyed by the doctor id, so the overlap check and the insert cannot
//! interleave with another booking for the same doctor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::error::{AppointmentError, AppointmentResult};
use crate::models::Appointment;
use crate::repository::{ensure_cancellable, AppointmentRepository};

const COLUMNS: &str = "id, clinic_id, doctor_id, patient_name, patient_phone, patient_email, starts_at, ends_at, \
     reason, status, created_at, cancelled_at";

pub struct PostgresAppointmentRepository {
    pool: PgPool,
}

impl PostgresAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn appointment_from_row(row: &PgRow) -> AppointmentResult<Appointment> {
    Ok(Appointment {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        doctor_id: row.try_get("doctor_id")?,
        patient_name: row.try_get("patient_name")?,
        patient_phone: row.try_get("patient_phone")?,
        patient_email: row.try_get("patient_email")?,
        starts_at: row.try_get("starts_at")?,
        ends_at: row.try_get("ends_at")?,
        reason: row.try_get("reason")?,
        status: row
            .try_get::<&str, _>("status")?
            .parse()
            .map_err(AppointmentError::Storage)?,
        created_at: row.try_get("created_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
    })
}

#[async_trait]
impl AppointmentRepository for PostgresAppointmentRepository {
    async fn insert_if_free(&self, appointment: Appointment) -> AppointmentResult<Appointment> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(appointment.doctor_id)
            .execute(&mut *tx)
            .await?;

        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appointments
                WHERE clinic_id = $1 AND doctor_id = $2 AND status = 'BOOKED'
                  AND starts_at < $4 AND $3 < ends_at
            )
            "#,
        )
        .bind(appointment.clinic_id)
        .bind(appointment.doctor_id)
        .bind(appointment.starts_at)
        .bind(appointment.ends_at)
        .fetch_one(&mut *tx)
        .await?;

        if taken {
            return Err(AppointmentError::slot_unavailable("doctor already has an appointment in this slot"));
        }

        let sql = format!("INSERT INTO appointments ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)");
        sqlx::query(&sql)
            .bind(appointment.id)
            .bind(appointment.clinic_id)
            .bind(appointment.doctor_id)
            .bind(&appointment.patient_name)
            .bind(&appointment.patient_phone)
            .bind(&appointment.patient_email)
            .bind(appointment.starts_at)
            .bind(appointment.ends_at)
            .bind(&appointment.reason)
            .bind(appointment.status.as_str())
            .bind(appointment.created_at)
            .bind(appointment.cancelled_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(appointment)
    }

    async fn get(&self, clinic_id: Uuid, appointment_id: Uuid) -> AppointmentResult<Option<Appointment>> {
        let sql = format!("SELECT {COLUMNS} FROM appointments WHERE id = $1 AND clinic_id = $2");
        sqlx::query(&sql)
            .bind(appointment_id)
            .bind(clinic_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(appointment_from_row)
            .transpose()
    }

    async fn cancel(&self, clinic_id: Uuid, appointment_id: Uuid, now: DateTime<Utc>) -> AppointmentResult<Appointment> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {COLUMNS} FROM appointments WHERE id = $1 AND clinic_id = $2 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(appointment_id)
            .bind(clinic_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppointmentError::NotFound("appointment".to_string()))?;
        let mut appointment = appointment_from_row(&row)?;
        ensure_cancellable(&appointment)?;

        sqlx::query("UPDATE appointments SET status = 'CANCELLED', cancelled_at = $2 WHERE id = $1")
            .bind(appointment_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        appointment.status = crate::models::AppointmentStatus::Cancelled;
        appointment.cancelled_at = Some(now);
        Ok(appointment)
    }

    async fn list_for_doctor(
        &self,
        clinic_id: Uuid,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppointmentResult<Vec<Appointment>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM appointments \
             WHERE clinic_id = $1 AND doctor_id = $2 AND starts_at >= $3 AND starts_at < $4 \
             ORDER BY starts_at, id"
        );
        sqlx::query(&sql)
            .bind(clinic_id)
            .bind(doctor_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(appointment_from_row)
            .collect()
    }
}
