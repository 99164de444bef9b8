use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{KhataError, KhataResult};
use crate::ledger::{self, LedgerPolicy};
use crate::models::*;

/// Storage for credit accounts and their ledgers.
///
/// [`KhataRepository::append_entry`] is the only way a balance changes: it
/// must insert the entry and update `current_balance` as one atomic unit,
/// serialized per account.
#[async_trait]
pub trait KhataRepository: Send + Sync {
    async fn insert_account(&self, account: CreditAccount) -> KhataResult<CreditAccount>;

    async fn get_account(&self, clinic_id: Uuid, account_id: Uuid) -> KhataResult<Option<CreditAccount>>;

    /// Accounts ordered by customer name
    async fn list_accounts(&self, clinic_id: Uuid, filter: &AccountFilter) -> KhataResult<Vec<CreditAccount>>;

    async fn update_account(
        &self,
        clinic_id: Uuid,
        account_id: Uuid,
        update: UpdateAccountRequest,
        now: DateTime<Utc>,
    ) -> KhataResult<CreditAccount>;

    /// Lock the account, check the draft with [`ledger::post`], store the
    /// entry with its running balance and update the account
    async fn append_entry(
        &self,
        clinic_id: Uuid,
        account_id: Uuid,
        draft: EntryDraft,
        policy: LedgerPolicy,
    ) -> KhataResult<LedgerPosting>;

    /// Ledger in sequence order
    async fn list_entries(&self, clinic_id: Uuid, account_id: Uuid) -> KhataResult<Vec<Transaction>>;
}

/// Case-insensitive search on name or phone
pub(crate) fn matches_filter(account: &CreditAccount, filter: &AccountFilter) -> bool {
    if let Some(active) = filter.active {
        if account.is_active != active {
            return false;
        }
    }
    match filter.search.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => {
            let term = term.to_lowercase();
            account.customer_name.to_lowercase().contains(&term) || account.phone.contains(&term)
        }
        _ => true,
    }
}

pub(crate) fn apply_account_update(
    account: &CreditAccount,
    update: &UpdateAccountRequest,
    now: DateTime<Utc>,
) -> CreditAccount {
    let mut next = account.clone();
    if let Some(name) = &update.customer_name {
        next.customer_name = name.clone();
    }
    if let Some(phone) = &update.phone {
        next.phone = phone.clone();
    }
    if let Some(address) = &update.address {
        next.address = Some(address.clone());
    }
    if let Some(limit) = update.credit_limit {
        next.credit_limit = limit;
    }
    if let Some(is_active) = update.is_active {
        next.is_active = is_active;
    }
    next.updated_at = now;
    next
}

#[derive(Default)]
struct KhataState {
    accounts: HashMap<Uuid, CreditAccount>,
    ledgers: HashMap<Uuid, Vec<Transaction>>,
}

/// In-memory repository; one mutex makes every append a single critical
/// section.
#[derive(Clone, Default)]
pub struct InMemoryKhataRepository {
    state: Arc<Mutex<KhataState>>,
}

impl InMemoryKhataRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KhataRepository for InMemoryKhataRepository {
    async fn insert_account(&self, account: CreditAccount) -> KhataResult<CreditAccount> {
        let mut state = self.state.lock();
        state.ledgers.insert(account.id, Vec::new());
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, clinic_id: Uuid, account_id: Uuid) -> KhataResult<Option<CreditAccount>> {
        let state = self.state.lock();
        Ok(state
            .accounts
            .get(&account_id)
            .filter(|a| a.clinic_id == clinic_id)
            .cloned())
    }

    async fn list_accounts(&self, clinic_id: Uuid, filter: &AccountFilter) -> KhataResult<Vec<CreditAccount>> {
        let state = self.state.lock();
        let mut accounts: Vec<CreditAccount> = state
            .accounts
            .values()
            .filter(|a| a.clinic_id == clinic_id && matches_filter(a, filter))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.customer_name.cmp(&b.customer_name).then(a.id.cmp(&b.id)));
        Ok(accounts)
    }

    async fn update_account(
        &self,
        clinic_id: Uuid,
        account_id: Uuid,
        update: UpdateAccountRequest,
        now: DateTime<Utc>,
    ) -> KhataResult<CreditAccount> {
        let mut state = self.state.lock();
        let account = state
            .accounts
            .get_mut(&account_id)
            .filter(|a| a.clinic_id == clinic_id)
            .ok_or_else(|| KhataError::not_found("credit account"))?;
        *account = apply_account_update(account, &update, now);
        Ok(account.clone())
    }

    async fn append_entry(
        &self,
        clinic_id: Uuid,
        account_id: Uuid,
        draft: EntryDraft,
        policy: LedgerPolicy,
    ) -> KhataResult<LedgerPosting> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let account = state
            .accounts
            .get_mut(&account_id)
            .filter(|a| a.clinic_id == clinic_id)
            .ok_or_else(|| KhataError::not_found("credit account"))?;
        let entries = state.ledgers.entry(account_id).or_default();

        let balance = ledger::post(account, &draft, policy)?;
        let sequence = i64::try_from(entries.len()).map_err(|e| KhataError::Storage(e.to_string()))? + 1;
        let entry = ledger::materialize(account_id, sequence, draft, balance);

        account.current_balance = balance;
        account.updated_at = entry.created_at;
        entries.push(entry.clone());

        Ok(LedgerPosting {
            account: account.clone(),
            transaction: entry,
        })
    }

    async fn list_entries(&self, clinic_id: Uuid, account_id: Uuid) -> KhataResult<Vec<Transaction>> {
        let state = self.state.lock();
        state
            .accounts
            .get(&account_id)
            .filter(|a| a.clinic_id == clinic_id)
            .ok_or_else(|| KhataError::not_found("credit account"))?;
        Ok(state.ledgers.get(&account_id).cloned().unwrap_or_default())
    }
}
