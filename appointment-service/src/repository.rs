use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppointmentError, AppointmentResult};
use crate::models::{Appointment, AppointmentStatus};

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Store `appointment` unless the doctor already has a BOOKED appointment
    /// overlapping it. Check and insert are atomic per doctor.
    async fn insert_if_free(&self, appointment: Appointment) -> AppointmentResult<Appointment>;

    async fn get(&self, clinic_id: Uuid, appointment_id: Uuid) -> AppointmentResult<Option<Appointment>>;

    /// Mark a BOOKED appointment CANCELLED
    async fn cancel(&self, clinic_id: Uuid, appointment_id: Uuid, now: DateTime<Utc>) -> AppointmentResult<Appointment>;

    /// A doctor's appointments starting in `[from, to)`, ordered by start
    async fn list_for_doctor(
        &self,
        clinic_id: Uuid,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppointmentResult<Vec<Appointment>>;
}

pub(crate) fn ensure_cancellable(appointment: &Appointment) -> AppointmentResult<()> {
    if appointment.status != AppointmentStatus::Booked {
        return Err(AppointmentError::Conflict {
            code: error_common::codes::appointments::APPOINTMENT_NOT_BOOKED,
            message: format!("appointment is {}", appointment.status),
        });
    }
    Ok(())
}

/// In-memory repository guarded by one mutex
#[derive(Clone, Default)]
pub struct InMemoryAppointmentRepository {
    appointments: Arc<Mutex<HashMap<Uuid, Appointment>>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn insert_if_free(&self, appointment: Appointment) -> AppointmentResult<Appointment> {
        let mut appointments = self.appointments.lock();
        let taken = appointments.values().any(|a| {
            a.clinic_id == appointment.clinic_id
                && a.blocks(appointment.doctor_id, appointment.starts_at, appointment.ends_at)
        });
        if taken {
            return Err(AppointmentError::slot_unavailable("doctor already has an appointment in this slot"));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn get(&self, clinic_id: Uuid, appointment_id: Uuid) -> AppointmentResult<Option<Appointment>> {
        Ok(self
            .appointments
            .lock()
            .get(&appointment_id)
            .filter(|a| a.clinic_id == clinic_id)
            .cloned())
    }

    async fn cancel(&self, clinic_id: Uuid, appointment_id: Uuid, now: DateTime<Utc>) -> AppointmentResult<Appointment> {
        let mut appointments = self.appointments.lock();
        let appointment = appointments
            .get_mut(&appointment_id)
            .filter(|a| a.clinic_id == clinic_id)
            .ok_or_else(|| AppointmentError::NotFound("appointment".to_string()))?;
        ensure_cancellable(appointment)?;
        appointment.status = AppointmentStatus::Cancelled;
        appointment.cancelled_at = Some(now);
        Ok(appointment.clone())
    }

    async fn list_for_doctor(
        &self,
        clinic_id: Uuid,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppointmentResult<Vec<Appointment>> {
        let mut list: Vec<Appointment> = self
            .appointments
            .lock()
            .values()
            .filter(|a| a.clinic_id == clinic_id && a.doctor_id == doctor_id && a.starts_at >= from && a.starts_at < to)
            .cloned()
            .collect();
        list.sort_by_key(|a| (a.starts_at, a.id));
        Ok(list)
    }
}
