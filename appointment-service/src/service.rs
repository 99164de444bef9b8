use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use logger_redacted::redact_phone;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppointmentError, AppointmentResult};
use crate::ics;
use crate::models::*;
use crate::repository::AppointmentRepository;

lazy_static! {
    static ref PHONE_RE: Regex = compile(r"^\+?[0-9][0-9 \-]{5,18}[0-9]$");
    static ref EMAIL_RE: Regex = compile(r"^[^\s@]+@[^\s@]+\.[^\s@]+$");
}

// Patterns are literals covered by tests
#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex literal")
}

/// Longest slot a single booking may take
const MAX_DURATION_MINUTES: i64 = 8 * 60;

/// How far ahead a slot may be booked
const BOOKING_HORIZON_DAYS: i64 = 2 * 365;

#[derive(Debug, Clone)]
pub struct AppointmentConfig {
    pub default_duration_minutes: i64,
}

impl Default for AppointmentConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: 15,
        }
    }
}

#[derive(Clone)]
pub struct AppointmentService {
    repo: Arc<dyn AppointmentRepository>,
    config: AppointmentConfig,
}

impl AppointmentService {
    pub fn new(repo: Arc<dyn AppointmentRepository>, config: AppointmentConfig) -> Self {
        Self { repo, config }
    }

    pub async fn book(&self, clinic_id: Uuid, req: BookAppointmentRequest) -> AppointmentResult<Appointment> {
        self.book_at(clinic_id, req, Utc::now()).await
    }

    /// Book relative to an explicit clock
    pub async fn book_at(
        &self,
        clinic_id: Uuid,
        req: BookAppointmentRequest,
        now: DateTime<Utc>,
    ) -> AppointmentResult<Appointment> {
        let patient_name = req.patient_name.trim().to_string();
        if patient_name.is_empty() {
            return Err(AppointmentError::validation("patient name is required"));
        }
        let patient_phone = req.patient_phone.trim().to_string();
        if !PHONE_RE.is_match(&patient_phone) {
            return Err(AppointmentError::validation("phone number is malformed"));
        }
        let patient_email = req
            .patient_email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        if let Some(email) = &patient_email {
            if !EMAIL_RE.is_match(email) {
                return Err(AppointmentError::validation("email address is malformed"));
            }
        }
        if req.starts_at < now {
            return Err(AppointmentError::validation("appointment cannot start in the past"));
        }
        let horizon = now
            .checked_add_signed(Duration::days(BOOKING_HORIZON_DAYS))
            .ok_or_else(|| AppointmentError::validation("appointment start is out of range"))?;
        if req.starts_at > horizon {
            return Err(AppointmentError::validation(format!(
                "appointments can be booked at most {BOOKING_HORIZON_DAYS} days ahead"
            )));
        }
        let minutes = req.duration_minutes.unwrap_or(self.config.default_duration_minutes);
        if minutes <= 0 || minutes > MAX_DURATION_MINUTES {
            return Err(AppointmentError::validation(format!(
                "duration must be between 1 and {MAX_DURATION_MINUTES} minutes"
            )));
        }
        let ends_at = req
            .starts_at
            .checked_add_signed(Duration::minutes(minutes))
            .ok_or_else(|| AppointmentError::validation("appointment start is out of range"))?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            clinic_id,
            doctor_id: req.doctor_id,
            patient_name,
            patient_phone,
            patient_email,
            starts_at: req.starts_at,
            ends_at,
            reason: req.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            status: AppointmentStatus::Booked,
            created_at: now,
            cancelled_at: None,
        };

        match self.repo.insert_if_free(appointment).await {
            Ok(appointment) => {
                info!(
                    %clinic_id,
                    appointment_id = %appointment.id,
                    doctor_id = %appointment.doctor_id,
                    phone = %redact_phone(&appointment.patient_phone),
                    starts_at = %appointment.starts_at,
                    "Appointment booked"
                );
                Ok(appointment)
            }
            Err(err) => {
                warn!(%clinic_id, doctor_id = %req.doctor_id, starts_at = %req.starts_at, error = %err, "Booking rejected");
                Err(err)
            }
        }
    }

    pub async fn cancel(&self, clinic_id: Uuid, appointment_id: Uuid) -> AppointmentResult<Appointment> {
        let appointment = self.repo.cancel(clinic_id, appointment_id, Utc::now()).await?;
        info!(%clinic_id, %appointment_id, "Appointment cancelled");
        Ok(appointment)
    }

    pub async fn get(&self, clinic_id: Uuid, appointment_id: Uuid) -> AppointmentResult<Appointment> {
        self.repo
            .get(clinic_id, appointment_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound("appointment".to_string()))
    }

    pub async fn list_for_doctor(
        &self,
        clinic_id: Uuid,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppointmentResult<Vec<Appointment>> {
        self.repo.list_for_doctor(clinic_id, doctor_id, from, to).await
    }

    pub async fn render_ics(&self, clinic_id: Uuid, appointment_id: Uuid, clinic_name: &str) -> AppointmentResult<String> {
        let appointment = self.get(clinic_id, appointment_id).await?;
        Ok(ics::render_ics(&appointment, clinic_name))
    }
}
