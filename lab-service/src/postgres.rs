//! PostgreSQL-backed lab repository
//!
//! Orders live in `lab_orders`; result values in `lab_result_values`, keyed
//! by order and position.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::error::{LabError, LabResult};
use crate::models::{order_sequence, LabOrder, LabResultValue};
use crate::repository::LabRepository;

pub struct PostgresLabRepository {
    pool: PgPool,
}

impl PostgresLabRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LabRepository for PostgresLabRepository {
    async fn insert_order(&self, order: LabOrder) -> LabResult<LabOrder> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO lab_orders (id, clinic_id, order_number, patient_name, patient_phone, test_name,
                                    status, ordered_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id)
        .bind(order.clinic_id)
        .bind(&order.order_number)
        .bind(&order.patient_name)
        .bind(&order.patient_phone)
        .bind(&order.test_name)
        .bind(order.status.as_str())
        .bind(order.ordered_at)
        .bind(order.completed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => LabError::DuplicateOrder(order.order_number.clone()),
            _ => LabError::Database(e),
        })?;

        for (position, value) in order.results.iter().enumerate() {
            let position = i32::try_from(position).map_err(|e| LabError::Storage(e.to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO lab_result_values (order_id, position, parameter, value, unit, reference_range, flag)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order.id)
            .bind(position)
            .bind(&value.parameter)
            .bind(&value.value)
            .bind(&value.unit)
            .bind(&value.reference_range)
            .bind(&value.flag)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(order)
    }

    async fn find_by_order_number(&self, order_number: &str) -> LabResult<Option<LabOrder>> {
        let Some(row) = sqlx::query(
            r#"
            SELECT id, clinic_id, order_number, patient_name, patient_phone, test_name, status,
                   ordered_at, completed_at
            FROM lab_orders WHERE order_number = $1
            "#,
        )
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let mut order = LabOrder {
            id: row.try_get("id")?,
            clinic_id: row.try_get("clinic_id")?,
            order_number: row.try_get("order_number")?,
            patient_name: row.try_get("patient_name")?,
            patient_phone: row.try_get("patient_phone")?,
            test_name: row.try_get("test_name")?,
            status: row
                .try_get::<&str, _>("status")?
                .parse()
                .map_err(LabError::Storage)?,
            results: Vec::new(),
            ordered_at: row.try_get("ordered_at")?,
            completed_at: row.try_get("completed_at")?,
        };

        let values = sqlx::query(
            r#"
            SELECT parameter, value, unit, reference_range, flag
            FROM lab_result_values WHERE order_id = $1 ORDER BY position
            "#,
        )
        .bind(order.id)
        .fetch_all(&self.pool)
        .await?;

        for value in &values {
            order.results.push(LabResultValue {
                parameter: value.try_get("parameter")?,
                value: value.try_get("value")?,
                unit: value.try_get("unit")?,
                reference_range: value.try_get("reference_range")?,
                flag: value.try_get("flag")?,
            });
        }
        Ok(Some(order))
    }

    async fn max_sequence_with_prefix(&self, prefix: &str) -> LabResult<u32> {
        // fixed-width suffixes, so the greatest number holds the greatest sequence
        let highest: Option<String> =
            sqlx::query_scalar("SELECT MAX(order_number) FROM lab_orders WHERE starts_with(order_number, $1)")
                .bind(prefix)
                .fetch_one(&self.pool)
                .await?;
        Ok(highest.as_deref().and_then(order_sequence).unwrap_or(0))
    }
}
