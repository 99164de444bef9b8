use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Ward category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WardType {
    General,
    SemiPrivate,
    Private,
    Icu,
    Nicu,
    Picu,
    Ccu,
    Emergency,
    Maternity,
    Pediatric,
}

impl WardType {
    pub const ALL: [WardType; 10] = [
        WardType::General,
        WardType::SemiPrivate,
        WardType::Private,
        WardType::Icu,
        WardType::Nicu,
        WardType::Picu,
        WardType::Ccu,
        WardType::Emergency,
        WardType::Maternity,
        WardType::Pediatric,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WardType::General => "GENERAL",
            WardType::SemiPrivate => "SEMI_PRIVATE",
            WardType::Private => "PRIVATE",
            WardType::Icu => "ICU",
            WardType::Nicu => "NICU",
            WardType::Picu => "PICU",
            WardType::Ccu => "CCU",
            WardType::Emergency => "EMERGENCY",
            WardType::Maternity => "MATERNITY",
            WardType::Pediatric => "PEDIATRIC",
        }
    }
}

impl fmt::Display for WardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WardType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown ward type: {s}"))
    }
}

/// Bed occupancy status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BedStatus {
    Available,
    Occupied,
    Reserved,
    Maintenance,
    OutOfService,
}

impl BedStatus {
    pub const ALL: [BedStatus; 5] = [
        BedStatus::Available,
        BedStatus::Occupied,
        BedStatus::Reserved,
        BedStatus::Maintenance,
        BedStatus::OutOfService,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BedStatus::Available => "AVAILABLE",
            BedStatus::Occupied => "OCCUPIED",
            BedStatus::Reserved => "RESERVED",
            BedStatus::Maintenance => "MAINTENANCE",
            BedStatus::OutOfService => "OUT_OF_SERVICE",
        }
    }
}

impl fmt::Display for BedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BedStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BedStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("unknown bed status: {s}"))
    }
}

/// A named grouping of beds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Ward {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub ward_type: WardType,
    pub floor: Option<String>,
    pub building: Option<String>,
    pub capacity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ward plus live bed counts, for dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WardSummary {
    #[serde(flatten)]
    pub ward: Ward,
    pub total_beds: i64,
    pub available_beds: i64,
    pub occupied_beds: i64,
}

/// A single bed, owned by exactly one ward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Bed {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub ward_id: Uuid,
    pub bed_number: String,
    pub status: BedStatus,
    /// Overrides the ward type when set
    #[serde(rename = "type")]
    pub bed_type: Option<WardType>,
    #[schema(value_type = String)]
    pub daily_rate: Decimal,
    pub features: Vec<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Links a patient to a bed for the length of a stay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Admission {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub bed_id: Uuid,
    pub admitting_doctor_id: Uuid,
    pub attending_doctor_id: Option<Uuid>,
    pub admission_diagnosis: Option<String>,
    pub chief_complaint: Option<String>,
    pub notes: Option<String>,
    pub discharge_notes: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Admission {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

/// Create ward request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateWardRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub ward_type: WardType,
    pub floor: Option<String>,
    pub building: Option<String>,
    pub capacity: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Update ward request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateWardRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ward_type: Option<WardType>,
    pub floor: Option<String>,
    pub building: Option<String>,
    pub capacity: Option<i32>,
    pub is_active: Option<bool>,
}

/// Create bed request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBedRequest {
    pub ward_id: Uuid,
    pub bed_number: String,
    #[serde(rename = "type")]
    pub bed_type: Option<WardType>,
    #[serde(default)]
    #[schema(value_type = String)]
    pub daily_rate: Decimal,
    #[serde(default)]
    pub features: Vec<String>,
    pub notes: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Update bed request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBedRequest {
    pub ward_id: Option<Uuid>,
    pub bed_number: Option<String>,
    #[serde(rename = "type")]
    pub bed_type: Option<WardType>,
    #[schema(value_type = Option<String>)]
    pub daily_rate: Option<Decimal>,
    pub features: Option<Vec<String>>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
    /// Manual transitions only; OCCUPIED is driven by admissions
    pub status: Option<BedStatus>,
}

/// Admit patient request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AdmitPatientRequest {
    pub patient_id: Uuid,
    pub bed_id: Uuid,
    pub admitting_doctor_id: Uuid,
    pub attending_doctor_id: Option<Uuid>,
    pub admission_diagnosis: Option<String>,
    pub chief_complaint: Option<String>,
    pub notes: Option<String>,
}

/// Discharge request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DischargeRequest {
    /// Send the bed to MAINTENANCE instead of AVAILABLE (cleaning, repairs)
    #[serde(default)]
    pub to_maintenance: bool,
    pub discharge_notes: Option<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_round_trip_through_their_wire_names() {
        for status in BedStatus::ALL {
            assert_eq!(status.as_str().parse::<BedStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!("occupied".parse::<BedStatus>().is_err());
    }

    #[test]
    fn ward_type_uses_screaming_snake_case() {
        let t: WardType = serde_json::from_str("\"SEMI_PRIVATE\"").unwrap();
        assert_eq!(t, WardType::SemiPrivate);
        assert_eq!("PEDIATRIC".parse::<WardType>().unwrap(), WardType::Pediatric);
    }

    #[test]
    fn create_bed_request_defaults() {
        let req: CreateBedRequest = serde_json::from_str(&format!(
            r#"{{"ward_id":"{}","bed_number":"B-1"}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert_eq!(req.daily_rate, Decimal::ZERO);
        assert!(req.features.is_empty());
        assert!(req.is_active);
    }
}
