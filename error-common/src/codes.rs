// Stable error codes surfaced to API clients.
// Clients switch on these strings, so existing values must never change.

pub mod clinic {
    /// Caller has no verified clinic attached to the request.
    pub const NO_CLINIC: &str = "NO_CLINIC";
}

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_FAILED";
    pub const MISSING_REQUIRED_FIELD: &str = "MISSING_REQUIRED_FIELD";
    pub const INVALID_FORMAT: &str = "INVALID_FORMAT";
}

pub mod ipd {
    pub const SLOT_UNAVAILABLE: &str = "SLOT_UNAVAILABLE";
    pub const BED_OCCUPIED: &str = "BED_OCCUPIED";
    pub const DUPLICATE_BED_NUMBER: &str = "DUPLICATE_BED_NUMBER";
    pub const WARD_AT_CAPACITY: &str = "WARD_AT_CAPACITY";
    pub const WARD_HAS_OCCUPIED_BEDS: &str = "WARD_HAS_OCCUPIED_BEDS";
    pub const PATIENT_ALREADY_ADMITTED: &str = "PATIENT_ALREADY_ADMITTED";
    pub const ADMISSION_CLOSED: &str = "ADMISSION_CLOSED";
    pub const INVALID_BED_TRANSITION: &str = "INVALID_BED_TRANSITION";
}

pub mod khata {
    pub const CREDIT_LIMIT_EXCEEDED: &str = "CREDIT_LIMIT_EXCEEDED";
    pub const OVERPAYMENT: &str = "OVERPAYMENT";
    pub const ACCOUNT_INACTIVE: &str = "ACCOUNT_INACTIVE";
}

pub mod appointments {
    pub use super::ipd::SLOT_UNAVAILABLE;
    pub const APPOINTMENT_NOT_BOOKED: &str = "APPOINTMENT_NOT_BOOKED";
}

pub mod lab {
    pub const DUPLICATE_ORDER_NUMBER: &str = "DUPLICATE_ORDER_NUMBER";
}

pub mod database {
    pub const QUERY_FAILED: &str = "DB_QUERY_FAILED";
}
