use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Ledger entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Sale,
    Payment,
    Adjustment,
    Refund,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Sale,
        TransactionType::Payment,
        TransactionType::Adjustment,
        TransactionType::Refund,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Sale => "SALE",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Adjustment => "ADJUSTMENT",
            TransactionType::Refund => "REFUND",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown transaction type: {s}"))
    }
}

/// Effect of an entry on what the customer owes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Raises the balance
    Debit,
    /// Lowers the balance
    Credit,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Debit => "DEBIT",
            Direction::Credit => "CREDIT",
        }
    }

    /// Signed effect of `amount` on the balance
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Direction::Debit => amount,
            Direction::Credit => -amount,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBIT" => Ok(Direction::Debit),
            "CREDIT" => Ok(Direction::Credit),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// A customer's running credit account with the clinic pharmacy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreditAccount {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub customer_name: String,
    pub phone: String,
    pub address: Option<String>,
    /// Zero means no limit
    #[schema(value_type = String)]
    pub credit_limit: Decimal,
    /// Positive means the customer owes money. Only ledger appends change it.
    #[schema(value_type = String)]
    pub current_balance: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Position in the account's ledger, starting at 1
    pub sequence: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub direction: Direction,
    /// Always positive; `direction` carries the sign
    #[schema(value_type = String)]
    pub amount: Decimal,
    /// Account balance immediately after this entry
    #[schema(value_type = String)]
    pub balance: Decimal,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub sale_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn signed_amount(&self) -> Decimal {
        self.direction.signed(self.amount)
    }
}

/// An entry about to be appended; the repository fills in sequence and balance
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub id: Uuid,
    pub kind: TransactionType,
    pub direction: Direction,
    pub amount: Decimal,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub sale_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Sale referenced from an account's ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SaleReference {
    pub sale_id: Uuid,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Account with its full ledger
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountDetail {
    pub account: CreditAccount,
    pub transactions: Vec<Transaction>,
    pub sales: Vec<SaleReference>,
}

/// Outcome of a ledger append
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerPosting {
    pub account: CreditAccount,
    pub transaction: Transaction,
}

/// Totals across a clinic's accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KhataSummary {
    pub total_accounts: u64,
    pub active_accounts: u64,
    pub accounts_with_balance: u64,
    pub accounts_over_limit: u64,
    #[schema(value_type = String)]
    pub total_outstanding: Decimal,
}

/// Result of replaying an account's ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LedgerVerification {
    pub account_id: Uuid,
    #[schema(value_type = String)]
    pub cached_balance: Decimal,
    #[schema(value_type = String)]
    pub computed_balance: Decimal,
    pub entries: u64,
    /// Entries whose stored running balance disagrees with the replay
    pub mismatched_entries: Vec<Uuid>,
    pub is_consistent: bool,
}

/// Filters for listing accounts
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AccountFilter {
    /// Case-insensitive match on customer name or phone
    pub search: Option<String>,
    pub active: Option<bool>,
}

/// Create account request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    pub customer_name: String,
    pub phone: String,
    pub address: Option<String>,
    #[serde(default)]
    #[schema(value_type = String)]
    pub credit_limit: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Update account request; the balance is not editable
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[schema(value_type = Option<String>)]
    pub credit_limit: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// Record sale request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordSaleRequest {
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub sale_id: Option<Uuid>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

/// Record payment request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub notes: Option<String>,
}

/// Record refund request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordRefundRequest {
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub sale_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Manual correction; a positive amount raises the balance, a negative one
/// lowers it
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordAdjustmentRequest {
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub description: Option<String>,
    pub notes: Option<String>,
}

fn default_true() -> bool {
    true
}
