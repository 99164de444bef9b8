//! PostgreSQL-backed IPD repository
//!
//! Each mutating call runs in one transaction. The row that serializes the
//! operation (the ward for bed inserts, the bed for admissions) is taken with
//! `SELECT ... FOR UPDATE` before the shared rules run, and partial unique
//! indexes back the same guarantees at the storage layer:
//! - one open admission per bed
//! - one open admission per patient per clinic
//! - bed numbers unique per ward, ignoring case

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{IpdError, IpdResult};
use crate::models::*;
use crate::repository::IpdRepository;
use crate::rules;
use error_common::codes;

const WARD_COLUMNS: &str =
    "id, clinic_id, name, ward_type, floor, building, capacity, is_active, created_at, updated_at";
const BED_COLUMNS: &str = "id, clinic_id, ward_id, bed_number, status, bed_type, daily_rate, features, notes, \
     is_active, created_at, updated_at";
const ADMISSION_COLUMNS: &str = "id, clinic_id, patient_id, bed_id, admitting_doctor_id, attending_doctor_id, \
     admission_diagnosis, chief_complaint, notes, discharge_notes, opened_at, closed_at";

/// PostgreSQL-backed IPD repository
pub struct PostgresIpdRepository {
    pool: PgPool,
}

impl PostgresIpdRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse<T: std::str::FromStr<Err = String>>(raw: &str) -> IpdResult<T> {
    raw.parse().map_err(IpdError::Storage)
}

fn ward_from_row(row: &PgRow) -> IpdResult<Ward> {
    Ok(Ward {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        name: row.try_get("name")?,
        ward_type: parse(row.try_get::<&str, _>("ward_type")?)?,
        floor: row.try_get("floor")?,
        building: row.try_get("building")?,
        capacity: row.try_get("capacity")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn bed_from_row(row: &PgRow) -> IpdResult<Bed> {
    let bed_type: Option<&str> = row.try_get("bed_type")?;
    Ok(Bed {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        ward_id: row.try_get("ward_id")?,
        bed_number: row.try_get("bed_number")?,
        status: parse(row.try_get::<&str, _>("status")?)?,
        bed_type: bed_type.map(parse).transpose()?,
        daily_rate: row.try_get("daily_rate")?,
        features: row.try_get("features")?,
        notes: row.try_get("notes")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn admission_from_row(row: &PgRow) -> IpdResult<Admission> {
    Ok(Admission {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        patient_id: row.try_get("patient_id")?,
        bed_id: row.try_get("bed_id")?,
        admitting_doctor_id: row.try_get("admitting_doctor_id")?,
        attending_doctor_id: row.try_get("attending_doctor_id")?,
        admission_diagnosis: row.try_get("admission_diagnosis")?,
        chief_complaint: row.try_get("chief_complaint")?,
        notes: row.try_get("notes")?,
        discharge_notes: row.try_get("discharge_notes")?,
        opened_at: row.try_get("opened_at")?,
        closed_at: row.try_get("closed_at")?,
    })
}

/// Map a unique violation on an open-admission index to its domain code
fn admission_conflict(err: sqlx::Error) -> IpdError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("admissions_open_patient_idx") => IpdError::conflict(
                    codes::ipd::PATIENT_ALREADY_ADMITTED,
                    "patient already has an open admission",
                ),
                _ => IpdError::conflict(codes::ipd::SLOT_UNAVAILABLE, "bed already has an open admission"),
            };
        }
    }
    IpdError::Database(err)
}

async fn lock_ward(tx: &mut Transaction<'_, Postgres>, clinic_id: Uuid, ward_id: Uuid) -> IpdResult<Ward> {
    let sql = format!("SELECT {WARD_COLUMNS} FROM wards WHERE id = $1 AND clinic_id = $2 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(ward_id)
        .bind(clinic_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| IpdError::not_found("ward"))?;
    ward_from_row(&row)
}

async fn lock_bed(tx: &mut Transaction<'_, Postgres>, clinic_id: Uuid, bed_id: Uuid) -> IpdResult<Bed> {
    let sql = format!("SELECT {BED_COLUMNS} FROM beds WHERE id = $1 AND clinic_id = $2 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(bed_id)
        .bind(clinic_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| IpdError::not_found("bed"))?;
    bed_from_row(&row)
}

async fn ward_beds(tx: &mut Transaction<'_, Postgres>, ward_id: Uuid) -> IpdResult<Vec<Bed>> {
    let sql = format!("SELECT {BED_COLUMNS} FROM beds WHERE ward_id = $1");
    sqlx::query(&sql)
        .bind(ward_id)
        .fetch_all(&mut **tx)
        .await?
        .iter()
        .map(bed_from_row)
        .collect()
}

#[async_trait]
impl IpdRepository for PostgresIpdRepository {
    async fn insert_ward(&self, ward: Ward) -> IpdResult<Ward> {
        sqlx::query(
            r#"
            INSERT INTO wards (id, clinic_id, name, ward_type, floor, building, capacity, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(ward.id)
        .bind(ward.clinic_id)
        .bind(&ward.name)
        .bind(ward.ward_type.as_str())
        .bind(&ward.floor)
        .bind(&ward.building)
        .bind(ward.capacity)
        .bind(ward.is_active)
        .bind(ward.created_at)
        .bind(ward.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(ward_id = %ward.id, "ward inserted");
        Ok(ward)
    }

    async fn get_ward(&self, clinic_id: Uuid, ward_id: Uuid) -> IpdResult<Option<Ward>> {
        let sql = format!("SELECT {WARD_COLUMNS} FROM wards WHERE id = $1 AND clinic_id = $2");
        sqlx::query(&sql)
            .bind(ward_id)
            .bind(clinic_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(ward_from_row)
            .transpose()
    }

    async fn list_wards(&self, clinic_id: Uuid) -> IpdResult<Vec<WardSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT w.id, w.clinic_id, w.name, w.ward_type, w.floor, w.building, w.capacity,
                   w.is_active, w.created_at, w.updated_at,
                   COUNT(b.id) AS total_beds,
                   COUNT(b.id) FILTER (WHERE b.status = 'AVAILABLE') AS available_beds,
                   COUNT(b.id) FILTER (WHERE b.status = 'OCCUPIED') AS occupied_beds
            FROM wards w
            LEFT JOIN beds b ON b.ward_id = w.id
            WHERE w.clinic_id = $1
            GROUP BY w.id
            ORDER BY w.name, w.id
            "#,
        )
        .bind(clinic_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(WardSummary {
                    ward: ward_from_row(row)?,
                    total_beds: row.try_get("total_beds")?,
                    available_beds: row.try_get("available_beds")?,
                    occupied_beds: row.try_get("occupied_beds")?,
                })
            })
            .collect()
    }

    async fn update_ward(
        &self,
        clinic_id: Uuid,
        ward_id: Uuid,
        update: UpdateWardRequest,
        now: DateTime<Utc>,
    ) -> IpdResult<Ward> {
        let mut tx = self.pool.begin().await?;
        let ward = lock_ward(&mut tx, clinic_id, ward_id).await?;
        let bed_count = ward_beds(&mut tx, ward_id).await?.len();
        let next = rules::apply_ward_update(&ward, &update, bed_count, now)?;

        sqlx::query(
            r#"
            UPDATE wards
            SET name = $2, ward_type = $3, floor = $4, building = $5, capacity = $6,
                is_active = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(next.id)
        .bind(&next.name)
        .bind(next.ward_type.as_str())
        .bind(&next.floor)
        .bind(&next.building)
        .bind(next.capacity)
        .bind(next.is_active)
        .bind(next.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(next)
    }

    async fn delete_ward(&self, clinic_id: Uuid, ward_id: Uuid) -> IpdResult<u64> {
        let mut tx = self.pool.begin().await?;
        lock_ward(&mut tx, clinic_id, ward_id).await?;
        let beds = ward_beds(&mut tx, ward_id).await?;
        rules::ensure_ward_deletable(&beds)?;

        let removed = sqlx::query("DELETE FROM beds WHERE ward_id = $1")
            .bind(ward_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM wards WHERE id = $1")
            .bind(ward_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn insert_bed(&self, bed: Bed) -> IpdResult<Bed> {
        let mut tx = self.pool.begin().await?;
        let ward = lock_ward(&mut tx, bed.clinic_id, bed.ward_id).await?;
        let existing = ward_beds(&mut tx, bed.ward_id).await?;
        rules::ensure_ward_accepts_bed(&ward, existing.len())?;
        rules::ensure_bed_number_unique(&existing, &bed.bed_number, None)?;

        sqlx::query(
            r#"
            INSERT INTO beds (id, clinic_id, ward_id, bed_number, status, bed_type, daily_rate,
                              features, notes, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(bed.id)
        .bind(bed.clinic_id)
        .bind(bed.ward_id)
        .bind(&bed.bed_number)
        .bind(bed.status.as_str())
        .bind(bed.bed_type.map(WardType::as_str))
        .bind(bed.daily_rate)
        .bind(&bed.features)
        .bind(&bed.notes)
        .bind(bed.is_active)
        .bind(bed.created_at)
        .bind(bed.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            IpdError::from_unique_violation(e, codes::ipd::DUPLICATE_BED_NUMBER, "bed number already exists in this ward")
        })?;

        tx.commit().await?;
        debug!(bed_id = %bed.id, ward_id = %bed.ward_id, "bed inserted");
        Ok(bed)
    }

    async fn get_bed(&self, clinic_id: Uuid, bed_id: Uuid) -> IpdResult<Option<Bed>> {
        let sql = format!("SELECT {BED_COLUMNS} FROM beds WHERE id = $1 AND clinic_id = $2");
        sqlx::query(&sql)
            .bind(bed_id)
            .bind(clinic_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(bed_from_row)
            .transpose()
    }

    async fn list_beds(&self, clinic_id: Uuid, ward_id: Option<Uuid>) -> IpdResult<Vec<Bed>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.clinic_id, b.ward_id, b.bed_number, b.status, b.bed_type, b.daily_rate,
                   b.features, b.notes, b.is_active, b.created_at, b.updated_at
            FROM beds b
            JOIN wards w ON w.id = b.ward_id
            WHERE b.clinic_id = $1 AND ($2::uuid IS NULL OR b.ward_id = $2)
            ORDER BY w.name, w.id, b.bed_number
            "#,
        )
        .bind(clinic_id)
        .bind(ward_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bed_from_row).collect()
    }

    async fn update_bed(
        &self,
        clinic_id: Uuid,
        bed_id: Uuid,
        update: UpdateBedRequest,
        now: DateTime<Utc>,
    ) -> IpdResult<Bed> {
        let mut tx = self.pool.begin().await?;
        let bed = lock_bed(&mut tx, clinic_id, bed_id).await?;
        let next = rules::apply_bed_update(&bed, &update, now)?;

        let moved = next.ward_id != bed.ward_id;
        if moved {
            let target = lock_ward(&mut tx, clinic_id, next.ward_id).await?;
            let target_beds = ward_beds(&mut tx, next.ward_id).await?;
            rules::ensure_ward_accepts_bed(&target, target_beds.len())?;
            rules::ensure_bed_number_unique(&target_beds, &next.bed_number, Some(bed_id))?;
        } else if !rules::same_bed_number(&next.bed_number, &bed.bed_number) {
            let siblings = ward_beds(&mut tx, next.ward_id).await?;
            rules::ensure_bed_number_unique(&siblings, &next.bed_number, Some(bed_id))?;
        }

        sqlx::query(
            r#"
            UPDATE beds
            SET ward_id = $2, bed_number = $3, status = $4, bed_type = $5, daily_rate = $6,
                features = $7, notes = $8, is_active = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(next.id)
        .bind(next.ward_id)
        .bind(&next.bed_number)
        .bind(next.status.as_str())
        .bind(next.bed_type.map(WardType::as_str))
        .bind(next.daily_rate)
        .bind(&next.features)
        .bind(&next.notes)
        .bind(next.is_active)
        .bind(next.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            IpdError::from_unique_violation(e, codes::ipd::DUPLICATE_BED_NUMBER, "bed number already exists in this ward")
        })?;

        tx.commit().await?;
        Ok(next)
    }

    async fn delete_bed(&self, clinic_id: Uuid, bed_id: Uuid) -> IpdResult<()> {
        let mut tx = self.pool.begin().await?;
        let bed = lock_bed(&mut tx, clinic_id, bed_id).await?;
        rules::ensure_bed_deletable(&bed)?;

        sqlx::query("DELETE FROM beds WHERE id = $1")
            .bind(bed_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn open_admission(&self, admission: Admission) -> IpdResult<Admission> {
        let mut tx = self.pool.begin().await?;
        let bed = lock_bed(&mut tx, admission.clinic_id, admission.bed_id).await?;

        let has_open: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM admissions WHERE clinic_id = $1 AND patient_id = $2 AND closed_at IS NULL)",
        )
        .bind(admission.clinic_id)
        .bind(admission.patient_id)
        .fetch_one(&mut *tx)
        .await?;

        let status = rules::check_admission(&bed, has_open)?;

        sqlx::query("UPDATE beds SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(bed.id)
            .bind(status.as_str())
            .bind(admission.opened_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO admissions (id, clinic_id, patient_id, bed_id, admitting_doctor_id, attending_doctor_id,
                                    admission_diagnosis, chief_complaint, notes, discharge_notes, opened_at, closed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(admission.id)
        .bind(admission.clinic_id)
        .bind(admission.patient_id)
        .bind(admission.bed_id)
        .bind(admission.admitting_doctor_id)
        .bind(admission.attending_doctor_id)
        .bind(&admission.admission_diagnosis)
        .bind(&admission.chief_complaint)
        .bind(&admission.notes)
        .bind(&admission.discharge_notes)
        .bind(admission.opened_at)
        .bind(admission.closed_at)
        .execute(&mut *tx)
        .await
        .map_err(admission_conflict)?;

        tx.commit().await?;
        Ok(admission)
    }

    async fn close_admission(
        &self,
        clinic_id: Uuid,
        admission_id: Uuid,
        request: DischargeRequest,
        now: DateTime<Utc>,
    ) -> IpdResult<(Admission, Bed)> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {ADMISSION_COLUMNS} FROM admissions WHERE id = $1 AND clinic_id = $2 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(admission_id)
            .bind(clinic_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| IpdError::not_found("admission"))?;
        let admission = admission_from_row(&row)?;
        let bed = lock_bed(&mut tx, clinic_id, admission.bed_id).await?;
        let status = rules::check_discharge(&admission, bed.status, request.to_maintenance)?;

        sqlx::query("UPDATE admissions SET closed_at = $2, discharge_notes = $3 WHERE id = $1")
            .bind(admission_id)
            .bind(now)
            .bind(&request.discharge_notes)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE beds SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(bed.id)
            .bind(status.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let closed = Admission {
            closed_at: Some(now),
            discharge_notes: request.discharge_notes,
            ..admission
        };
        let released = Bed {
            status,
            updated_at: now,
            ..bed
        };
        Ok((closed, released))
    }

    async fn get_admission(&self, clinic_id: Uuid, admission_id: Uuid) -> IpdResult<Option<Admission>> {
        let sql = format!("SELECT {ADMISSION_COLUMNS} FROM admissions WHERE id = $1 AND clinic_id = $2");
        sqlx::query(&sql)
            .bind(admission_id)
            .bind(clinic_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(admission_from_row)
            .transpose()
    }

    async fn list_admissions(&self, clinic_id: Uuid, open_only: bool) -> IpdResult<Vec<Admission>> {
        let sql = format!(
            "SELECT {ADMISSION_COLUMNS} FROM admissions \
             WHERE clinic_id = $1 AND (NOT $2 OR closed_at IS NULL) \
             ORDER BY opened_at DESC, id"
        );
        sqlx::query(&sql)
            .bind(clinic_id)
            .bind(open_only)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(admission_from_row)
            .collect()
    }
}
