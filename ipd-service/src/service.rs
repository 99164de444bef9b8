use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{IpdError, IpdResult};
use crate::models::*;
use crate::repository::IpdRepository;
use crate::rules::normalize_features;

/// Tunables for the IPD service
#[derive(Debug, Clone)]
pub struct IpdConfig {
    /// Upper bound for a ward's capacity
    pub max_ward_capacity: i32,
}

impl Default for IpdConfig {
    fn default() -> Self {
        Self { max_ward_capacity: 500 }
    }
}

/// In-patient department service: wards, beds and admissions
#[derive(Clone)]
pub struct IpdService {
    repo: Arc<dyn IpdRepository>,
    config: IpdConfig,
}

impl IpdService {
    pub fn new(repo: Arc<dyn IpdRepository>, config: IpdConfig) -> Self {
        Self { repo, config }
    }

    fn validate_capacity(&self, capacity: i32) -> IpdResult<()> {
        if capacity < 1 || capacity > self.config.max_ward_capacity {
            return Err(IpdError::validation(format!(
                "capacity must be between 1 and {}",
                self.config.max_ward_capacity
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Wards
    // ------------------------------------------------------------------

    pub async fn create_ward(&self, clinic_id: Uuid, req: CreateWardRequest) -> IpdResult<Ward> {
        let name = required(&req.name, "ward name")?;
        self.validate_capacity(req.capacity)?;

        let now = Utc::now();
        let ward = Ward {
            id: Uuid::new_v4(),
            clinic_id,
            name,
            ward_type: req.ward_type,
            floor: trimmed(req.floor),
            building: trimmed(req.building),
            capacity: req.capacity,
            is_active: req.is_active,
            created_at: now,
            updated_at: now,
        };

        let ward = self.repo.insert_ward(ward).await?;
        info!(%clinic_id, ward_id = %ward.id, ward_type = %ward.ward_type, "Ward created");
        Ok(ward)
    }

    pub async fn update_ward(&self, clinic_id: Uuid, ward_id: Uuid, mut req: UpdateWardRequest) -> IpdResult<Ward> {
        if let Some(name) = &req.name {
            req.name = Some(required(name, "ward name")?);
        }
        if let Some(capacity) = req.capacity {
            self.validate_capacity(capacity)?;
        }
        self.repo.update_ward(clinic_id, ward_id, req, Utc::now()).await
    }

    pub async fn get_ward(&self, clinic_id: Uuid, ward_id: Uuid) -> IpdResult<Ward> {
        self.repo
            .get_ward(clinic_id, ward_id)
            .await?
            .ok_or_else(|| IpdError::not_found("ward"))
    }

    pub async fn list_wards(&self, clinic_id: Uuid) -> IpdResult<Vec<WardSummary>> {
        self.repo.list_wards(clinic_id).await
    }

    pub async fn delete_ward(&self, clinic_id: Uuid, ward_id: Uuid) -> IpdResult<()> {
        let removed = self.repo.delete_ward(clinic_id, ward_id).await?;
        info!(%clinic_id, %ward_id, beds_removed = removed, "Ward deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Beds
    // ------------------------------------------------------------------

    pub async fn create_bed(&self, clinic_id: Uuid, req: CreateBedRequest) -> IpdResult<Bed> {
        let bed_number = required(&req.bed_number, "bed number")?;
        non_negative_rate(req.daily_rate)?;

        let now = Utc::now();
        let bed = Bed {
            id: Uuid::new_v4(),
            clinic_id,
            ward_id: req.ward_id,
            bed_number,
            status: BedStatus::Available,
            bed_type: req.bed_type,
            daily_rate: req.daily_rate,
            features: normalize_features(&req.features),
            notes: trimmed(req.notes),
            is_active: req.is_active,
            created_at: now,
            updated_at: now,
        };

        let bed = self.repo.insert_bed(bed).await?;
        info!(%clinic_id, bed_id = %bed.id, ward_id = %bed.ward_id, "Bed created");
        Ok(bed)
    }

    pub async fn update_bed(&self, clinic_id: Uuid, bed_id: Uuid, mut req: UpdateBedRequest) -> IpdResult<Bed> {
        if let Some(number) = &req.bed_number {
            req.bed_number = Some(required(number, "bed number")?);
        }
        if let Some(rate) = req.daily_rate {
            non_negative_rate(rate)?;
        }

        let requested_status = req.status;
        let bed = self.repo.update_bed(clinic_id, bed_id, req, Utc::now()).await?;
        if let Some(status) = requested_status {
            info!(%clinic_id, %bed_id, %status, "Bed status set");
        }
        Ok(bed)
    }

    /// Manual status change only; see [`BedStatus::allows_manual`]
    pub async fn set_bed_status(&self, clinic_id: Uuid, bed_id: Uuid, status: BedStatus) -> IpdResult<Bed> {
        let req = UpdateBedRequest {
            status: Some(status),
            ..Default::default()
        };
        self.update_bed(clinic_id, bed_id, req).await
    }

    pub async fn get_bed(&self, clinic_id: Uuid, bed_id: Uuid) -> IpdResult<Bed> {
        self.repo
            .get_bed(clinic_id, bed_id)
            .await?
            .ok_or_else(|| IpdError::not_found("bed"))
    }

    pub async fn list_beds(&self, clinic_id: Uuid, ward_id: Option<Uuid>) -> IpdResult<Vec<Bed>> {
        self.repo.list_beds(clinic_id, ward_id).await
    }

    pub async fn delete_bed(&self, clinic_id: Uuid, bed_id: Uuid) -> IpdResult<()> {
        self.repo.delete_bed(clinic_id, bed_id).await?;
        info!(%clinic_id, %bed_id, "Bed deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Admissions
    // ------------------------------------------------------------------

    /// Admit a patient. The bed check and the OCCUPIED flip happen in one
    /// atomic repository call, so two racing admits cannot both succeed.
    pub async fn admit_patient(&self, clinic_id: Uuid, req: AdmitPatientRequest) -> IpdResult<Admission> {
        let admission = Admission {
            id: Uuid::new_v4(),
            clinic_id,
            patient_id: req.patient_id,
            bed_id: req.bed_id,
            admitting_doctor_id: req.admitting_doctor_id,
            attending_doctor_id: req.attending_doctor_id,
            admission_diagnosis: trimmed(req.admission_diagnosis),
            chief_complaint: trimmed(req.chief_complaint),
            notes: trimmed(req.notes),
            discharge_notes: None,
            opened_at: Utc::now(),
            closed_at: None,
        };

        match self.repo.open_admission(admission).await {
            Ok(admission) => {
                info!(%clinic_id, admission_id = %admission.id, bed_id = %admission.bed_id, "Patient admitted");
                Ok(admission)
            }
            Err(err) => {
                if let Some(code) = err.code() {
                    warn!(%clinic_id, bed_id = %req.bed_id, code, "Admission rejected");
                }
                Err(err)
            }
        }
    }

    pub async fn discharge_patient(
        &self,
        clinic_id: Uuid,
        admission_id: Uuid,
        mut req: DischargeRequest,
    ) -> IpdResult<(Admission, Bed)> {
        req.discharge_notes = trimmed(req.discharge_notes);
        let (admission, bed) = self
            .repo
            .close_admission(clinic_id, admission_id, req, Utc::now())
            .await?;
        info!(%clinic_id, %admission_id, bed_id = %bed.id, bed_status = %bed.status, "Patient discharged");
        Ok((admission, bed))
    }

    pub async fn get_admission(&self, clinic_id: Uuid, admission_id: Uuid) -> IpdResult<Admission> {
        self.repo
            .get_admission(clinic_id, admission_id)
            .await?
            .ok_or_else(|| IpdError::not_found("admission"))
    }

    pub async fn list_admissions(&self, clinic_id: Uuid, open_only: bool) -> IpdResult<Vec<Admission>> {
        self.repo.list_admissions(clinic_id, open_only).await
    }
}

fn required(value: &str, field: &str) -> IpdResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(IpdError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Upper bound of a `NUMERIC(12, 2)` column
const MAX_RATE: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

fn non_negative_rate(rate: Decimal) -> IpdResult<()> {
    if rate < Decimal::ZERO {
        return Err(IpdError::validation("daily rate cannot be negative"));
    }
    if rate.normalize().scale() > 2 {
        return Err(IpdError::validation("daily rate cannot have more than two decimal places"));
    }
    if rate >= MAX_RATE {
        return Err(IpdError::validation("daily rate is too large"));
    }
    Ok(())
}
