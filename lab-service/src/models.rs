use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{LabError, LabResult};

lazy_static! {
    static ref ORDER_NUMBER_RE: Regex = compile(r"^LAB-\d{8}-\d{4}$");
}

// Literal pattern, exercised by tests
#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex literal")
}

/// Validate the public `LAB-YYYYMMDD-NNNN` format
pub fn validate_order_number(order_number: &str) -> LabResult<()> {
    if ORDER_NUMBER_RE.is_match(order_number) {
        Ok(())
    } else {
        Err(LabError::validation("order number must look like LAB-YYYYMMDD-NNNN"))
    }
}

/// Order number for the `seq`-th order of `date`
pub fn next_order_number(date: NaiveDate, seq: u32) -> LabResult<String> {
    if seq == 0 || seq > 9999 {
        return Err(LabError::validation("daily order sequence must be between 1 and 9999"));
    }
    Ok(format!("LAB-{}-{seq:04}", date.format("%Y%m%d")))
}

/// Daily sequence of a well-formed order number (`LAB-YYYYMMDD-NNNN` → `NNNN`)
pub fn order_sequence(order_number: &str) -> Option<u32> {
    if !ORDER_NUMBER_RE.is_match(order_number) {
        return None;
    }
    order_number.rsplit('-').next()?.parse().ok()
}

/// Digits only, with a leading Nepal country code (977) removed
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix("977") {
        Some(local) if local.len() >= 7 => local.to_string(),
        _ => digits,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabOrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl LabOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LabOrderStatus::Pending => "PENDING",
            LabOrderStatus::Processing => "PROCESSING",
            LabOrderStatus::Completed => "COMPLETED",
            LabOrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for LabOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(LabOrderStatus::Pending),
            "PROCESSING" => Ok(LabOrderStatus::Processing),
            "COMPLETED" => Ok(LabOrderStatus::Completed),
            "CANCELLED" => Ok(LabOrderStatus::Cancelled),
            other => Err(format!("unknown lab order status: {other}")),
        }
    }
}

/// One measured parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LabResultValue {
    pub parameter: String,
    pub value: String,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    /// e.g. "H" / "L" when outside the reference range
    pub flag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LabOrder {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub order_number: String,
    pub patient_name: String,
    /// Stored normalised, see [`normalize_phone`]
    pub patient_phone: String,
    pub test_name: String,
    pub status: LabOrderStatus,
    pub results: Vec<LabResultValue>,
    pub ordered_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// What the public lookup reveals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LabLookupResult {
    pub order_number: String,
    pub patient_name: String,
    pub test_name: String,
    pub status: LabOrderStatus,
    pub ordered_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Present only once the order is COMPLETED
    pub results: Option<Vec<LabResultValue>>,
}

impl From<LabOrder> for LabLookupResult {
    fn from(order: LabOrder) -> Self {
        let results = (order.status == LabOrderStatus::Completed).then_some(order.results);
        Self {
            order_number: order.order_number,
            patient_name: order.patient_name,
            test_name: order.test_name,
            status: order.status,
            ordered_at: order.ordered_at,
            completed_at: order.completed_at,
            results,
        }
    }
}

/// Public lookup query
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LabLookupQuery {
    pub phone: String,
    pub order_number: String,
}

/// Store an order, optionally with results
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordLabResultRequest {
    /// Generated from the order date when absent
    pub order_number: Option<String>,
    pub patient_name: String,
    pub patient_phone: String,
    pub test_name: String,
    pub status: LabOrderStatus,
    #[serde(default)]
    pub results: Vec<LabResultValue>,
}
