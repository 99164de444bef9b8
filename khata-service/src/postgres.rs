//! PostgreSQL-backed khata repository
//!
//! Appends lock the account row with `SELECT ... FOR UPDATE`, so concurrent
//! sales and payments against one account are applied one after another and
//! each sees the balance left by the previous one. The entry insert and the
//! balance update commit together or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::{KhataError, KhataResult};
use crate::ledger::{self, LedgerPolicy};
use crate::models::*;
use crate::repository::{apply_account_update, KhataRepository};

const ACCOUNT_COLUMNS: &str = "id, clinic_id, customer_name, phone, address, credit_limit, current_balance, \
     is_active, created_at, updated_at";
const ENTRY_COLUMNS: &str =
    "id, account_id, sequence, kind, direction, amount, balance, description, notes, sale_id, created_at";

/// PostgreSQL-backed khata repository
pub struct PostgresKhataRepository {
    pool: PgPool,
}

impl PostgresKhataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: &PgRow) -> KhataResult<CreditAccount> {
    Ok(CreditAccount {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        customer_name: row.try_get("customer_name")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        credit_limit: row.try_get("credit_limit")?,
        current_balance: row.try_get("current_balance")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> KhataResult<Transaction> {
    Ok(Transaction {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        sequence: row.try_get("sequence")?,
        kind: row.try_get::<&str, _>("kind")?.parse().map_err(KhataError::Storage)?,
        direction: row
            .try_get::<&str, _>("direction")?
            .parse()
            .map_err(KhataError::Storage)?,
        amount: row.try_get("amount")?,
        balance: row.try_get("balance")?,
        description: row.try_get("description")?,
        notes: row.try_get("notes")?,
        sale_id: row.try_get("sale_id")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn lock_account(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    clinic_id: Uuid,
    account_id: Uuid,
) -> KhataResult<CreditAccount> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM credit_accounts WHERE id = $1 AND clinic_id = $2 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(account_id)
        .bind(clinic_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| KhataError::not_found("credit account"))?;
    account_from_row(&row)
}

#[async_trait]
impl KhataRepository for PostgresKhataRepository {
    async fn insert_account(&self, account: CreditAccount) -> KhataResult<CreditAccount> {
        sqlx::query(
            r#"
            INSERT INTO credit_accounts (id, clinic_id, customer_name, phone, address, credit_limit,
                                         current_balance, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(account.id)
        .bind(account.clinic_id)
        .bind(&account.customer_name)
        .bind(&account.phone)
        .bind(&account.address)
        .bind(account.credit_limit)
        .bind(account.current_balance)
        .bind(account.is_active)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(account_id = %account.id, "credit account inserted");
        Ok(account)
    }

    async fn get_account(&self, clinic_id: Uuid, account_id: Uuid) -> KhataResult<Option<CreditAccount>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM credit_accounts WHERE id = $1 AND clinic_id = $2");
        sqlx::query(&sql)
            .bind(account_id)
            .bind(clinic_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(account_from_row)
            .transpose()
    }

    async fn list_accounts(&self, clinic_id: Uuid, filter: &AccountFilter) -> KhataResult<Vec<CreditAccount>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")));

        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM credit_accounts \
             WHERE clinic_id = $1 \
               AND ($2::bool IS NULL OR is_active = $2) \
               AND ($3::text IS NULL OR customer_name ILIKE $3 OR phone LIKE $3) \
             ORDER BY customer_name, id"
        );
        sqlx::query(&sql)
            .bind(clinic_id)
            .bind(filter.active)
            .bind(search)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(account_from_row)
            .collect()
    }

    async fn update_account(
        &self,
        clinic_id: Uuid,
        account_id: Uuid,
        update: UpdateAccountRequest,
        now: DateTime<Utc>,
    ) -> KhataResult<CreditAccount> {
        let mut tx = self.pool.begin().await?;
        let account = lock_account(&mut tx, clinic_id, account_id).await?;
        let next = apply_account_update(&account, &update, now);

        sqlx::query(
            r#"
            UPDATE credit_accounts
            SET customer_name = $2, phone = $3, address = $4, credit_limit = $5, is_active = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(next.id)
        .bind(&next.customer_name)
        .bind(&next.phone)
        .bind(&next.address)
        .bind(next.credit_limit)
        .bind(next.is_active)
        .bind(next.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(next)
    }

    async fn append_entry(
        &self,
        clinic_id: Uuid,
        account_id: Uuid,
        draft: EntryDraft,
        policy: LedgerPolicy,
    ) -> KhataResult<LedgerPosting> {
        let mut tx = self.pool.begin().await?;
        let mut account = lock_account(&mut tx, clinic_id, account_id).await?;

        let balance = ledger::post(&account, &draft, policy)?;
        let last: Option<i64> = sqlx::query_scalar("SELECT MAX(sequence) FROM khata_transactions WHERE account_id = $1")
            .bind(account_id)
            .fetch_one(&mut *tx)
            .await?;
        let entry = ledger::materialize(account_id, last.unwrap_or(0) + 1, draft, balance);

        let sql = format!(
            "INSERT INTO khata_transactions ({ENTRY_COLUMNS}, clinic_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        );
        sqlx::query(&sql)
            .bind(entry.id)
            .bind(entry.account_id)
            .bind(entry.sequence)
            .bind(entry.kind.as_str())
            .bind(entry.direction.as_str())
            .bind(entry.amount)
            .bind(entry.balance)
            .bind(&entry.description)
            .bind(&entry.notes)
            .bind(entry.sale_id)
            .bind(entry.created_at)
            .bind(clinic_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE credit_accounts SET current_balance = $2, updated_at = $3 WHERE id = $1")
            .bind(account_id)
            .bind(balance)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        account.current_balance = balance;
        account.updated_at = entry.created_at;
        Ok(LedgerPosting {
            account,
            transaction: entry,
        })
    }

    async fn list_entries(&self, clinic_id: Uuid, account_id: Uuid) -> KhataResult<Vec<Transaction>> {
        if self.get_account(clinic_id, account_id).await?.is_none() {
            return Err(KhataError::not_found("credit account"));
        }

        let sql = format!("SELECT {ENTRY_COLUMNS} FROM khata_transactions WHERE account_id = $1 ORDER BY sequence");
        sqlx::query(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(entry_from_row)
            .collect()
    }
}
