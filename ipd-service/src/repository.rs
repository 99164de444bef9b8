use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{IpdError, IpdResult};
use crate::models::*;
use crate::rules;

/// Storage for wards, beds and admissions.
///
/// Every mutating method is a single atomic unit: implementations must make
/// the read-check-write sequence inside it serializable with respect to other
/// calls touching the same ward, bed or admission.
#[async_trait]
pub trait IpdRepository: Send + Sync {
    async fn insert_ward(&self, ward: Ward) -> IpdResult<Ward>;

    async fn get_ward(&self, clinic_id: Uuid, ward_id: Uuid) -> IpdResult<Option<Ward>>;

    async fn list_wards(&self, clinic_id: Uuid) -> IpdResult<Vec<WardSummary>>;

    /// Apply an update; capacity may not drop below the ward's bed count
    async fn update_ward(
        &self,
        clinic_id: Uuid,
        ward_id: Uuid,
        update: UpdateWardRequest,
        now: DateTime<Utc>,
    ) -> IpdResult<Ward>;

    /// Delete a ward and all of its beds; rejected while any bed is occupied.
    /// Returns the number of beds removed.
    async fn delete_ward(&self, clinic_id: Uuid, ward_id: Uuid) -> IpdResult<u64>;

    /// Insert a bed under its ward (ward must exist, be active, have room and
    /// not already hold the bed number)
    async fn insert_bed(&self, bed: Bed) -> IpdResult<Bed>;

    async fn get_bed(&self, clinic_id: Uuid, bed_id: Uuid) -> IpdResult<Option<Bed>>;

    /// Beds ordered by ward name, then bed number
    async fn list_beds(&self, clinic_id: Uuid, ward_id: Option<Uuid>) -> IpdResult<Vec<Bed>>;

    async fn update_bed(
        &self,
        clinic_id: Uuid,
        bed_id: Uuid,
        update: UpdateBedRequest,
        now: DateTime<Utc>,
    ) -> IpdResult<Bed>;

    async fn delete_bed(&self, clinic_id: Uuid, bed_id: Uuid) -> IpdResult<()>;

    /// Check the bed is AVAILABLE, flip it to OCCUPIED and store the
    /// admission, all or nothing
    async fn open_admission(&self, admission: Admission) -> IpdResult<Admission>;

    /// Close the admission and release its bed, all or nothing
    async fn close_admission(
        &self,
        clinic_id: Uuid,
        admission_id: Uuid,
        request: DischargeRequest,
        now: DateTime<Utc>,
    ) -> IpdResult<(Admission, Bed)>;

    async fn get_admission(&self, clinic_id: Uuid, admission_id: Uuid) -> IpdResult<Option<Admission>>;

    /// Admissions newest first
    async fn list_admissions(&self, clinic_id: Uuid, open_only: bool) -> IpdResult<Vec<Admission>>;
}

#[derive(Default)]
struct IpdState {
    wards: HashMap<Uuid, Ward>,
    beds: HashMap<Uuid, Bed>,
    admissions: HashMap<Uuid, Admission>,
}

impl IpdState {
    fn ward(&self, clinic_id: Uuid, ward_id: Uuid) -> IpdResult<&Ward> {
        self.wards
            .get(&ward_id)
            .filter(|w| w.clinic_id == clinic_id)
            .ok_or_else(|| IpdError::not_found("ward"))
    }

    fn bed(&self, clinic_id: Uuid, bed_id: Uuid) -> IpdResult<&Bed> {
        self.beds
            .get(&bed_id)
            .filter(|b| b.clinic_id == clinic_id)
            .ok_or_else(|| IpdError::not_found("bed"))
    }

    fn beds_in(&self, ward_id: Uuid) -> impl Iterator<Item = &Bed> {
        self.beds.values().filter(move |b| b.ward_id == ward_id)
    }

    fn patient_has_open_admission(&self, clinic_id: Uuid, patient_id: Uuid) -> bool {
        self.admissions
            .values()
            .any(|a| a.clinic_id == clinic_id && a.patient_id == patient_id && a.is_open())
    }
}

/// In-memory repository for tests and single-node development.
///
/// One mutex guards all three tables so each trait method runs as a single
/// critical section.
#[derive(Clone, Default)]
pub struct InMemoryIpdRepository {
    state: Arc<Mutex<IpdState>>,
}

impl InMemoryIpdRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IpdRepository for InMemoryIpdRepository {
    async fn insert_ward(&self, ward: Ward) -> IpdResult<Ward> {
        let mut state = self.state.lock();
        state.wards.insert(ward.id, ward.clone());
        Ok(ward)
    }

    async fn get_ward(&self, clinic_id: Uuid, ward_id: Uuid) -> IpdResult<Option<Ward>> {
        let state = self.state.lock();
        Ok(state.ward(clinic_id, ward_id).ok().cloned())
    }

    async fn list_wards(&self, clinic_id: Uuid) -> IpdResult<Vec<WardSummary>> {
        let state = self.state.lock();
        let mut wards: Vec<WardSummary> = state
            .wards
            .values()
            .filter(|w| w.clinic_id == clinic_id)
            .map(|w| {
                let (mut total, mut available, mut occupied) = (0, 0, 0);
                for bed in state.beds_in(w.id) {
                    total += 1;
                    match bed.status {
                        BedStatus::Available => available += 1,
                        BedStatus::Occupied => occupied += 1,
                        _ => {}
                    }
                }
                WardSummary {
                    ward: w.clone(),
                    total_beds: total,
                    available_beds: available,
                    occupied_beds: occupied,
                }
            })
            .collect();
        wards.sort_by(|a, b| a.ward.name.cmp(&b.ward.name).then(a.ward.id.cmp(&b.ward.id)));
        Ok(wards)
    }

    async fn update_ward(
        &self,
        clinic_id: Uuid,
        ward_id: Uuid,
        update: UpdateWardRequest,
        now: DateTime<Utc>,
    ) -> IpdResult<Ward> {
        let mut state = self.state.lock();
        let ward = state.ward(clinic_id, ward_id)?;
        let bed_count = state.beds_in(ward_id).count();
        let next = rules::apply_ward_update(ward, &update, bed_count, now)?;
        state.wards.insert(ward_id, next.clone());
        Ok(next)
    }

    async fn delete_ward(&self, clinic_id: Uuid, ward_id: Uuid) -> IpdResult<u64> {
        let mut state = self.state.lock();
        state.ward(clinic_id, ward_id)?;
        rules::ensure_ward_deletable(state.beds_in(ward_id))?;

        let before = state.beds.len();
        state.beds.retain(|_, b| b.ward_id != ward_id);
        let removed = before - state.beds.len();
        state.wards.remove(&ward_id);
        Ok(removed as u64)
    }

    async fn insert_bed(&self, bed: Bed) -> IpdResult<Bed> {
        let mut state = self.state.lock();
        let ward = state.ward(bed.clinic_id, bed.ward_id)?;
        rules::ensure_ward_accepts_bed(ward, state.beds_in(bed.ward_id).count())?;
        rules::ensure_bed_number_unique(state.beds_in(bed.ward_id), &bed.bed_number, None)?;
        state.beds.insert(bed.id, bed.clone());
        Ok(bed)
    }

    async fn get_bed(&self, clinic_id: Uuid, bed_id: Uuid) -> IpdResult<Option<Bed>> {
        let state = self.state.lock();
        Ok(state.bed(clinic_id, bed_id).ok().cloned())
    }

    async fn list_beds(&self, clinic_id: Uuid, ward_id: Option<Uuid>) -> IpdResult<Vec<Bed>> {
        let state = self.state.lock();
        let mut beds: Vec<(&str, Bed)> = state
            .beds
            .values()
            .filter(|b| b.clinic_id == clinic_id && ward_id.map_or(true, |w| b.ward_id == w))
            .map(|b| {
                let ward_name = state.wards.get(&b.ward_id).map_or("", |w| w.name.as_str());
                (ward_name, b.clone())
            })
            .collect();
        beds.sort_by(|(wa, a), (wb, b)| {
            wa.cmp(wb)
                .then(a.ward_id.cmp(&b.ward_id))
                .then(a.bed_number.cmp(&b.bed_number))
        });
        Ok(beds.into_iter().map(|(_, b)| b).collect())
    }

    async fn update_bed(
        &self,
        clinic_id: Uuid,
        bed_id: Uuid,
        update: UpdateBedRequest,
        now: DateTime<Utc>,
    ) -> IpdResult<Bed> {
        let mut state = self.state.lock();
        let bed = state.bed(clinic_id, bed_id)?;
        let next = rules::apply_bed_update(bed, &update, now)?;

        if next.ward_id != bed.ward_id {
            let target = state.ward(clinic_id, next.ward_id)?;
            rules::ensure_ward_accepts_bed(target, state.beds_in(next.ward_id).count())?;
        }
        if next.ward_id != bed.ward_id || !rules::same_bed_number(&next.bed_number, &bed.bed_number) {
            rules::ensure_bed_number_unique(state.beds_in(next.ward_id), &next.bed_number, Some(bed_id))?;
        }

        state.beds.insert(bed_id, next.clone());
        Ok(next)
    }

    async fn delete_bed(&self, clinic_id: Uuid, bed_id: Uuid) -> IpdResult<()> {
        let mut state = self.state.lock();
        rules::ensure_bed_deletable(state.bed(clinic_id, bed_id)?)?;
        state.beds.remove(&bed_id);
        Ok(())
    }

    async fn open_admission(&self, admission: Admission) -> IpdResult<Admission> {
        let mut state = self.state.lock();
        let bed = state.bed(admission.clinic_id, admission.bed_id)?;
        let has_open = state.patient_has_open_admission(admission.clinic_id, admission.patient_id);
        let status = rules::check_admission(bed, has_open)?;

        if let Some(bed) = state.beds.get_mut(&admission.bed_id) {
            bed.status = status;
            bed.updated_at = admission.opened_at;
        }
        state.admissions.insert(admission.id, admission.clone());
        Ok(admission)
    }

    async fn close_admission(
        &self,
        clinic_id: Uuid,
        admission_id: Uuid,
        request: DischargeRequest,
        now: DateTime<Utc>,
    ) -> IpdResult<(Admission, Bed)> {
        let mut state = self.state.lock();
        let admission = state
            .admissions
            .get(&admission_id)
            .filter(|a| a.clinic_id == clinic_id)
            .ok_or_else(|| IpdError::not_found("admission"))?;
        let bed = state.bed(clinic_id, admission.bed_id)?;
        let status = rules::check_discharge(admission, bed.status, request.to_maintenance)?;

        let mut closed = admission.clone();
        closed.closed_at = Some(now);
        closed.discharge_notes = request.discharge_notes;
        let mut released = bed.clone();
        released.status = status;
        released.updated_at = now;

        state.admissions.insert(admission_id, closed.clone());
        state.beds.insert(released.id, released.clone());
        Ok((closed, released))
    }

    async fn get_admission(&self, clinic_id: Uuid, admission_id: Uuid) -> IpdResult<Option<Admission>> {
        let state = self.state.lock();
        Ok(state
            .admissions
            .get(&admission_id)
            .filter(|a| a.clinic_id == clinic_id)
            .cloned())
    }

    async fn list_admissions(&self, clinic_id: Uuid, open_only: bool) -> IpdResult<Vec<Admission>> {
        let state = self.state.lock();
        let mut admissions: Vec<Admission> = state
            .admissions
            .values()
            .filter(|a| a.clinic_id == clinic_id && (!open_only || a.is_open()))
            .cloned()
            .collect();
        admissions.sort_by(|a, b| b.opened_at.cmp(&a.opened_at).then(a.id.cmp(&b.id)));
        Ok(admissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn ward(clinic_id: Uuid, name: &str, capacity: i32) -> Ward {
        let now = Utc::now();
        Ward {
            id: Uuid::new_v4(),
            clinic_id,
            name: name.to_string(),
            ward_type: WardType::General,
            floor: None,
            building: None,
            capacity,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn bed(ward: &Ward, number: &str) -> Bed {
        let now = Utc::now();
        Bed {
            id: Uuid::new_v4(),
            clinic_id: ward.clinic_id,
            ward_id: ward.id,
            bed_number: number.to_string(),
            status: BedStatus::Available,
            bed_type: None,
            daily_rate: Decimal::new(150_000, 2),
            features: vec![],
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn admission(bed: &Bed, patient_id: Uuid) -> Admission {
        Admission {
            id: Uuid::new_v4(),
            clinic_id: bed.clinic_id,
            patient_id,
            bed_id: bed.id,
            admitting_doctor_id: Uuid::new_v4(),
            attending_doctor_id: None,
            admission_diagnosis: None,
            chief_complaint: None,
            notes: None,
            discharge_notes: None,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    #[tokio::test]
    async fn concurrent_admissions_to_one_bed_admit_exactly_one() {
        let repo = InMemoryIpdRepository::new();
        let clinic = Uuid::new_v4();
        let w = repo.insert_ward(ward(clinic, "General", 10)).await.unwrap();
        let b = repo.insert_bed(bed(&w, "G-1")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let repo = repo.clone();
            let a = admission(&b, Uuid::new_v4());
            handles.push(tokio::spawn(async move { repo.open_admission(a).await }));
        }

        let mut admitted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(err) => {
                    assert_eq!(err.code(), Some("SLOT_UNAVAILABLE"));
                    rejected += 1;
                }
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(rejected, 31);

        let stored = repo.get_bed(clinic, b.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BedStatus::Occupied);
        assert_eq!(repo.list_admissions(clinic, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn discharge_frees_bed_and_rejects_second_close() {
        let repo = InMemoryIpdRepository::new();
        let clinic = Uuid::new_v4();
        let w = repo.insert_ward(ward(clinic, "ICU", 2)).await.unwrap();
        let b = repo.insert_bed(bed(&w, "ICU-1")).await.unwrap();
        let a = repo.open_admission(admission(&b, Uuid::new_v4())).await.unwrap();

        let (closed, released) = repo
            .close_admission(clinic, a.id, DischargeRequest::default(), Utc::now())
            .await
            .unwrap();
        assert!(!closed.is_open());
        assert_eq!(released.status, BedStatus::Available);

        let again = repo
            .close_admission(clinic, a.id, DischargeRequest::default(), Utc::now())
            .await;
        assert_eq!(again.unwrap_err().code(), Some("ADMISSION_CLOSED"));

        // the bed is free for the next patient
        assert!(repo.open_admission(admission(&b, Uuid::new_v4())).await.is_ok());
    }

    #[tokio::test]
    async fn ward_capacity_and_bed_numbers_are_enforced() {
        let repo = InMemoryIpdRepository::new();
        let clinic = Uuid::new_v4();
        let w = repo.insert_ward(ward(clinic, "Maternity", 2)).await.unwrap();
        repo.insert_bed(bed(&w, "M-1")).await.unwrap();

        let dup = repo.insert_bed(bed(&w, "m-1")).await.unwrap_err();
        assert_eq!(dup.code(), Some("DUPLICATE_BED_NUMBER"));

        repo.insert_bed(bed(&w, "M-2")).await.unwrap();
        let full = repo.insert_bed(bed(&w, "M-3")).await.unwrap_err();
        assert_eq!(full.code(), Some("WARD_AT_CAPACITY"));

        let shrink = UpdateWardRequest {
            capacity: Some(1),
            ..Default::default()
        };
        assert!(matches!(
            repo.update_ward(clinic, w.id, shrink, Utc::now()).await,
            Err(IpdError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn ward_delete_cascades_unless_a_bed_is_occupied() {
        let repo = InMemoryIpdRepository::new();
        let clinic = Uuid::new_v4();
        let w = repo.insert_ward(ward(clinic, "Pediatric", 5)).await.unwrap();
        let b1 = repo.insert_bed(bed(&w, "P-1")).await.unwrap();
        repo.insert_bed(bed(&w, "P-2")).await.unwrap();
        let a = repo.open_admission(admission(&b1, Uuid::new_v4())).await.unwrap();

        let blocked = repo.delete_ward(clinic, w.id).await.unwrap_err();
        assert_eq!(blocked.code(), Some("WARD_HAS_OCCUPIED_BEDS"));

        repo.close_admission(clinic, a.id, DischargeRequest::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(repo.delete_ward(clinic, w.id).await.unwrap(), 2);
        assert!(repo.list_beds(clinic, None).await.unwrap().is_empty());
        // admission history outlives the bed
        assert!(repo.get_admission(clinic, a.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rows_are_scoped_to_their_clinic() {
        let repo = InMemoryIpdRepository::new();
        let clinic = Uuid::new_v4();
        let other = Uuid::new_v4();
        let w = repo.insert_ward(ward(clinic, "General", 5)).await.unwrap();
        let b = repo.insert_bed(bed(&w, "G-1")).await.unwrap();

        assert!(repo.get_ward(other, w.id).await.unwrap().is_none());
        assert!(repo.get_bed(other, b.id).await.unwrap().is_none());
        assert!(repo.list_wards(other).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_bed(other, b.id).await,
            Err(IpdError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn beds_list_in_ward_then_number_order() {
        let repo = InMemoryIpdRepository::new();
        let clinic = Uuid::new_v4();
        let icu = repo.insert_ward(ward(clinic, "ICU", 5)).await.unwrap();
        let gen = repo.insert_ward(ward(clinic, "General", 5)).await.unwrap();
        repo.insert_bed(bed(&icu, "I-2")).await.unwrap();
        repo.insert_bed(bed(&gen, "G-1")).await.unwrap();
        repo.insert_bed(bed(&icu, "I-1")).await.unwrap();

        let numbers: Vec<String> = repo
            .list_beds(clinic, None)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.bed_number)
            .collect();
        assert_eq!(numbers, vec!["G-1", "I-1", "I-2"]);

        let summaries = repo.list_wards(clinic).await.unwrap();
        assert_eq!(summaries[1].ward.name, "ICU");
        assert_eq!(summaries[1].total_beds, 2);
        assert_eq!(summaries[1].available_beds, 2);
    }
}
