//! Invariant checks shared by every repository backend.
//!
//! Backends load the rows they need under a lock (mutex or `FOR UPDATE`),
//! run these checks, then write. Keeping the checks here means the in-memory
//! and Postgres stores cannot drift apart.

use chrono::{DateTime, Utc};
use error_common::codes;

use crate::error::{IpdError, IpdResult};
use crate::models::{Admission, Bed, BedStatus, UpdateBedRequest, UpdateWardRequest, Ward};
use crate::status::BedEvent;

/// Bed numbers compare case-insensitively, ignoring surrounding whitespace
pub fn same_bed_number(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

pub fn ensure_bed_number_unique<'a>(
    ward_beds: impl IntoIterator<Item = &'a Bed>,
    bed_number: &str,
    exclude: Option<uuid::Uuid>,
) -> IpdResult<()> {
    let clash = ward_beds
        .into_iter()
        .filter(|b| Some(b.id) != exclude)
        .any(|b| same_bed_number(&b.bed_number, bed_number));

    if clash {
        return Err(IpdError::conflict(
            codes::ipd::DUPLICATE_BED_NUMBER,
            format!("bed number '{}' already exists in this ward", bed_number.trim()),
        ));
    }
    Ok(())
}

/// A ward takes a new bed only while active and below capacity
pub fn ensure_ward_accepts_bed(ward: &Ward, current_beds: usize) -> IpdResult<()> {
    if !ward.is_active {
        return Err(IpdError::validation(format!("ward '{}' is inactive", ward.name)));
    }
    if i64::try_from(current_beds).unwrap_or(i64::MAX) >= i64::from(ward.capacity) {
        return Err(IpdError::conflict(
            codes::ipd::WARD_AT_CAPACITY,
            format!("ward '{}' already holds {} beds", ward.name, ward.capacity),
        ));
    }
    Ok(())
}

pub fn apply_ward_update(ward: &Ward, req: &UpdateWardRequest, bed_count: usize, now: DateTime<Utc>) -> IpdResult<Ward> {
    let mut next = ward.clone();
    if let Some(name) = &req.name {
        next.name = name.trim().to_string();
    }
    if let Some(ward_type) = req.ward_type {
        next.ward_type = ward_type;
    }
    if let Some(floor) = &req.floor {
        next.floor = Some(floor.clone());
    }
    if let Some(building) = &req.building {
        next.building = Some(building.clone());
    }
    if let Some(capacity) = req.capacity {
        if i64::from(capacity) < i64::try_from(bed_count).unwrap_or(i64::MAX) {
            return Err(IpdError::validation(format!(
                "capacity {capacity} is below the {bed_count} beds already in the ward"
            )));
        }
        next.capacity = capacity;
    }
    if let Some(is_active) = req.is_active {
        next.is_active = is_active;
    }
    next.updated_at = now;
    Ok(next)
}

/// Apply a bed update. Ward reassignment checks that need the target
/// ward's rows are done by the caller before this.
pub fn apply_bed_update(bed: &Bed, req: &UpdateBedRequest, now: DateTime<Utc>) -> IpdResult<Bed> {
    let mut next = bed.clone();

    if let Some(ward_id) = req.ward_id {
        if ward_id != bed.ward_id && bed.status == BedStatus::Occupied {
            return Err(IpdError::conflict(
                codes::ipd::BED_OCCUPIED,
                "an occupied bed cannot be moved to another ward",
            ));
        }
        next.ward_id = ward_id;
    }
    if let Some(number) = &req.bed_number {
        next.bed_number = number.trim().to_string();
    }
    if let Some(bed_type) = req.bed_type {
        next.bed_type = Some(bed_type);
    }
    if let Some(rate) = req.daily_rate {
        next.daily_rate = rate;
    }
    if let Some(features) = &req.features {
        next.features = normalize_features(features);
    }
    if let Some(notes) = &req.notes {
        next.notes = Some(notes.clone());
    }
    if let Some(is_active) = req.is_active {
        if !is_active && bed.status == BedStatus::Occupied {
            return Err(IpdError::conflict(
                codes::ipd::BED_OCCUPIED,
                "an occupied bed cannot be deactivated",
            ));
        }
        next.is_active = is_active;
    }
    if let Some(status) = req.status {
        next.status = bed.status.apply(BedEvent::Set(status))?;
    }

    next.updated_at = now;
    Ok(next)
}

/// Trim, drop blanks and de-duplicate (case-insensitive), keeping first spelling
pub fn normalize_features(features: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(features.len());
    for feature in features {
        let f = feature.trim();
        if f.is_empty() || out.iter().any(|seen| seen.eq_ignore_ascii_case(f)) {
            continue;
        }
        out.push(f.to_string());
    }
    out
}

/// Check the bed can take the patient right now; returns the bed's status
/// after admission.
pub fn check_admission(bed: &Bed, patient_has_open_admission: bool) -> IpdResult<BedStatus> {
    if patient_has_open_admission {
        return Err(IpdError::conflict(
            codes::ipd::PATIENT_ALREADY_ADMITTED,
            "patient already has an open admission",
        ));
    }
    if !bed.is_active {
        return Err(IpdError::conflict(codes::ipd::SLOT_UNAVAILABLE, "bed is inactive"));
    }
    bed.status.apply(BedEvent::Admit).map_err(|_| {
        IpdError::conflict(
            codes::ipd::SLOT_UNAVAILABLE,
            format!("bed {} is {}", bed.bed_number, bed.status),
        )
    })
}

/// Bed status after closing `admission`
pub fn check_discharge(admission: &Admission, bed_status: BedStatus, to_maintenance: bool) -> IpdResult<BedStatus> {
    if !admission.is_open() {
        return Err(IpdError::conflict(
            codes::ipd::ADMISSION_CLOSED,
            "admission is already closed",
        ));
    }
    bed_status.apply(BedEvent::Discharge { to_maintenance })
}

pub fn ensure_bed_deletable(bed: &Bed) -> IpdResult<()> {
    if bed.status == BedStatus::Occupied {
        return Err(IpdError::conflict(
            codes::ipd::BED_OCCUPIED,
            format!("bed {} is occupied", bed.bed_number),
        ));
    }
    Ok(())
}

pub fn ensure_ward_deletable<'a>(ward_beds: impl IntoIterator<Item = &'a Bed>) -> IpdResult<()> {
    let occupied = ward_beds
        .into_iter()
        .filter(|b| b.status == BedStatus::Occupied)
        .count();
    if occupied > 0 {
        return Err(IpdError::conflict(
            codes::ipd::WARD_HAS_OCCUPIED_BEDS,
            format!("{occupied} bed(s) in this ward are occupied"),
        ));
    }
    Ok(())
}
