//! Ledger arithmetic, free of storage.
//!
//! The balance of an account is the sum of its entries' signed amounts, in
//! sequence order. [`post`] decides whether an entry may be appended and what
//! the balance becomes; [`verify`] replays a ledger against the cached value.

use rust_decimal::Decimal;

use crate::error::{KhataError, KhataResult};
use crate::models::{CreditAccount, Direction, EntryDraft, LedgerVerification, Transaction, TransactionType};

/// Posting rules that are configurable per deployment
#[derive(Debug, Clone, Copy)]
pub struct LedgerPolicy {
    /// Reject sales that would push the balance above a non-zero credit limit
    pub enforce_credit_limit: bool,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            enforce_credit_limit: true,
        }
    }
}

/// Amounts and balances are stored as `NUMERIC(12, 2)`
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Reject values the ledger columns cannot hold exactly: more than two
/// decimal places, or ten or more integer digits.
pub fn ensure_currency(value: Decimal, field: &str) -> KhataResult<()> {
    if value.normalize().scale() > 2 {
        return Err(KhataError::validation(format!(
            "{field} cannot have more than two decimal places"
        )));
    }
    if value.abs() >= MAX_AMOUNT {
        return Err(KhataError::validation(format!("{field} is too large")));
    }
    Ok(())
}

/// Balance after appending `entry` to `account`, or why it cannot be appended.
pub fn post(account: &CreditAccount, entry: &EntryDraft, policy: LedgerPolicy) -> KhataResult<Decimal> {
    if entry.amount <= Decimal::ZERO {
        return Err(KhataError::validation("amount must be greater than zero"));
    }
    ensure_currency(entry.amount, "amount")?;

    let next = account.current_balance + entry.direction.signed(entry.amount);
    if next >= MAX_AMOUNT {
        return Err(KhataError::validation("balance would exceed the largest storable amount"));
    }

    match entry.direction {
        Direction::Debit => {
            if !account.is_active {
                return Err(KhataError::AccountInactive);
            }
            let limited = policy.enforce_credit_limit
                && entry.kind == TransactionType::Sale
                && account.credit_limit > Decimal::ZERO;
            if limited && next > account.credit_limit {
                return Err(KhataError::LimitExceeded {
                    limit: account.credit_limit,
                    attempted: next,
                });
            }
        }
        Direction::Credit => {
            if next < Decimal::ZERO {
                return Err(KhataError::Overpayment {
                    amount: entry.amount,
                    balance: account.current_balance,
                });
            }
        }
    }

    Ok(next)
}

/// Sum of signed amounts
pub fn replay<'a>(entries: impl IntoIterator<Item = &'a Transaction>) -> Decimal {
    entries.into_iter().map(Transaction::signed_amount).sum()
}

/// Replay `entries` (in sequence order) and compare with the stored values.
pub fn verify(account: &CreditAccount, entries: &[Transaction]) -> LedgerVerification {
    let mut running = Decimal::ZERO;
    let mut mismatched = Vec::new();
    for entry in entries {
        running += entry.signed_amount();
        if entry.balance != running {
            mismatched.push(entry.id);
        }
    }

    LedgerVerification {
        account_id: account.id,
        cached_balance: account.current_balance,
        computed_balance: running,
        entries: entries.len() as u64,
        is_consistent: mismatched.is_empty() && running == account.current_balance,
        mismatched_entries: mismatched,
    }
}

/// Build the stored row for a draft that [`post`] accepted
pub fn materialize(account_id: uuid::Uuid, sequence: i64, draft: EntryDraft, balance: Decimal) -> Transaction {
    Transaction {
        id: draft.id,
        account_id,
        sequence,
        kind: draft.kind,
        direction: draft.direction,
        amount: draft.amount,
        balance,
        description: draft.description,
        notes: draft.notes,
        sale_id: draft.sale_id,
        created_at: draft.created_at,
    }
}
