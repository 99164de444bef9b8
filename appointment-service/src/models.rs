use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    /// Holds the doctor's slot
    Booked,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "BOOKED",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOKED" => Ok(AppointmentStatus::Booked),
            "CANCELLED" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("unknown appointment status: {other}")),
        }
    }
}

/// A patient's slot with a doctor, `[starts_at, ends_at)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Appointment {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub patient_phone: String,
    pub patient_email: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Half-open interval overlap with `[starts_at, ends_at)`
    pub fn overlaps(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
        self.starts_at < ends_at && starts_at < self.ends_at
    }

    /// Whether this appointment blocks a new booking in the given window
    pub fn blocks(&self, doctor_id: Uuid, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
        self.doctor_id == doctor_id && self.status == AppointmentStatus::Booked && self.overlaps(starts_at, ends_at)
    }
}

/// Book appointment request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub patient_phone: String,
    pub patient_email: Option<String>,
    pub starts_at: DateTime<Utc>,
    /// Defaults to the configured slot length
    pub duration_minutes: Option<i64>,
    pub reason: Option<String>,
}

/// Booking confirmation body
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingConfirmation {
    pub appointment: Appointment,
    /// Relative URL of the `.ics` download
    pub ics_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, hour, minute, 0).unwrap()
    }

    fn appointment(start: DateTime<Utc>, minutes: i64) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            clinic_id: Uuid::nil(),
            doctor_id: Uuid::nil(),
            patient_name: "Anita".to_string(),
            patient_phone: "9841000000".to_string(),
            patient_email: None,
            starts_at: start,
            ends_at: start + Duration::minutes(minutes),
            reason: None,
            status: AppointmentStatus::Booked,
            created_at: start,
            cancelled_at: None,
        }
    }

    #[test]
    fn adjacent_slots_do_not_overlap() {
        let a = appointment(at(10, 0), 15);
        assert!(!a.overlaps(at(10, 15), at(10, 30)));
        assert!(!a.overlaps(at(9, 45), at(10, 0)));
        assert!(a.overlaps(at(10, 14), at(10, 29)));
        assert!(a.overlaps(at(9, 0), at(11, 0)));
    }

    #[test]
    fn cancelled_and_other_doctors_do_not_block() {
        let mut a = appointment(at(10, 0), 15);
        assert!(a.blocks(Uuid::nil(), at(10, 5), at(10, 20)));
        assert!(!a.blocks(Uuid::new_v4(), at(10, 5), at(10, 20)));
        a.status = AppointmentStatus::Cancelled;
        assert!(!a.blocks(Uuid::nil(), at(10, 5), at(10, 20)));
    }
}
