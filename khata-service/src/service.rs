use chrono::Utc;
use logger_redacted::redact_phone;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{KhataError, KhataResult};
use crate::ledger::{self, LedgerPolicy};
use crate::models::*;
use crate::reporting;
use crate::repository::KhataRepository;

/// Credit account (khata) service
#[derive(Clone)]
pub struct KhataService {
    repo: Arc<dyn KhataRepository>,
    policy: LedgerPolicy,
}

impl KhataService {
    pub fn new(repo: Arc<dyn KhataRepository>, policy: LedgerPolicy) -> Self {
        Self { repo, policy }
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    pub async fn create_account(&self, clinic_id: Uuid, req: CreateAccountRequest) -> KhataResult<CreditAccount> {
        let customer_name = required(&req.customer_name, "customer name")?;
        let phone = validate_phone(&req.phone)?;
        validate_limit(req.credit_limit)?;

        let now = Utc::now();
        let account = CreditAccount {
            id: Uuid::new_v4(),
            clinic_id,
            customer_name,
            phone,
            address: trimmed(req.address),
            credit_limit: req.credit_limit,
            current_balance: Decimal::ZERO,
            is_active: req.is_active,
            created_at: now,
            updated_at: now,
        };

        let account = self.repo.insert_account(account).await?;
        info!(
            %clinic_id,
            account_id = %account.id,
            phone = %redact_phone(&account.phone),
            "Credit account opened"
        );
        Ok(account)
    }

    pub async fn update_account(
        &self,
        clinic_id: Uuid,
        account_id: Uuid,
        mut req: UpdateAccountRequest,
    ) -> KhataResult<CreditAccount> {
        if let Some(name) = &req.customer_name {
            req.customer_name = Some(required(name, "customer name")?);
        }
        if let Some(phone) = &req.phone {
            req.phone = Some(validate_phone(phone)?);
        }
        if let Some(limit) = req.credit_limit {
            validate_limit(limit)?;
        }
        self.repo.update_account(clinic_id, account_id, req, Utc::now()).await
    }

    pub async fn get_account(&self, clinic_id: Uuid, account_id: Uuid) -> KhataResult<CreditAccount> {
        self.repo
            .get_account(clinic_id, account_id)
            .await?
            .ok_or_else(|| KhataError::not_found("credit account"))
    }

    /// Account, its ledger and the sales the ledger references
    pub async fn get_account_detail(&self, clinic_id: Uuid, account_id: Uuid) -> KhataResult<AccountDetail> {
        let account = self.get_account(clinic_id, account_id).await?;
        let transactions = self.repo.list_entries(clinic_id, account_id).await?;

        let mut seen = HashSet::new();
        let sales = transactions
            .iter()
            .filter(|t| t.kind == TransactionType::Sale)
            .filter_map(|t| t.sale_id.map(|sale_id| (sale_id, t)))
            .filter(|(sale_id, _)| seen.insert(*sale_id))
            .map(|(sale_id, t)| SaleReference {
                sale_id,
                amount: t.amount,
                created_at: t.created_at,
            })
            .collect();

        Ok(AccountDetail {
            account,
            transactions,
            sales,
        })
    }

    pub async fn list_accounts(&self, clinic_id: Uuid, filter: &AccountFilter) -> KhataResult<Vec<CreditAccount>> {
        self.repo.list_accounts(clinic_id, filter).await
    }

    pub async fn summary(&self, clinic_id: Uuid) -> KhataResult<KhataSummary> {
        let accounts = self.repo.list_accounts(clinic_id, &AccountFilter::default()).await?;

        let mut summary = KhataSummary {
            total_accounts: accounts.len() as u64,
            active_accounts: 0,
            accounts_with_balance: 0,
            accounts_over_limit: 0,
            total_outstanding: Decimal::ZERO,
        };
        for account in &accounts {
            if account.is_active {
                summary.active_accounts += 1;
            }
            if account.current_balance > Decimal::ZERO {
                summary.accounts_with_balance += 1;
                summary.total_outstanding += account.current_balance;
            }
            if account.credit_limit > Decimal::ZERO && account.current_balance > account.credit_limit {
                summary.accounts_over_limit += 1;
            }
        }
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    pub async fn record_sale(&self, clinic_id: Uuid, account_id: Uuid, req: RecordSaleRequest) -> KhataResult<LedgerPosting> {
        let draft = EntryDraft {
            id: Uuid::new_v4(),
            kind: TransactionType::Sale,
            direction: Direction::Debit,
            amount: req.amount,
            description: trimmed(req.description),
            notes: trimmed(req.notes),
            sale_id: req.sale_id,
            created_at: Utc::now(),
        };
        self.append(clinic_id, account_id, draft).await
    }

    pub async fn record_payment(
        &self,
        clinic_id: Uuid,
        account_id: Uuid,
        req: RecordPaymentRequest,
    ) -> KhataResult<LedgerPosting> {
        let draft = EntryDraft {
            id: Uuid::new_v4(),
            kind: TransactionType::Payment,
            direction: Direction::Credit,
            amount: req.amount,
            description: Some("Payment received".to_string()),
            notes: trimmed(req.notes),
            sale_id: None,
            created_at: Utc::now(),
        };
        self.append(clinic_id, account_id, draft).await
    }

    pub async fn record_refund(&self, clinic_id: Uuid, account_id: Uuid, req: RecordRefundRequest) -> KhataResult<LedgerPosting> {
        let draft = EntryDraft {
            id: Uuid::new_v4(),
            kind: TransactionType::Refund,
            direction: Direction::Credit,
            amount: req.amount,
            description: Some("Refund".to_string()),
            notes: trimmed(req.notes),
            sale_id: req.sale_id,
            created_at: Utc::now(),
        };
        self.append(clinic_id, account_id, draft).await
    }

    /// A positive amount is a DEBIT, a negative one a CREDIT; zero is rejected
    pub async fn record_adjustment(
        &self,
        clinic_id: Uuid,
        account_id: Uuid,
        req: RecordAdjustmentRequest,
    ) -> KhataResult<LedgerPosting> {
        let direction = if req.amount < Decimal::ZERO {
            Direction::Credit
        } else {
            Direction::Debit
        };
        let draft = EntryDraft {
            id: Uuid::new_v4(),
            kind: TransactionType::Adjustment,
            direction,
            amount: req.amount.abs(),
            description: trimmed(req.description).or_else(|| Some("Manual adjustment".to_string())),
            notes: trimmed(req.notes),
            sale_id: None,
            created_at: Utc::now(),
        };
        self.append(clinic_id, account_id, draft).await
    }

    async fn append(&self, clinic_id: Uuid, account_id: Uuid, draft: EntryDraft) -> KhataResult<LedgerPosting> {
        let kind = draft.kind;
        let amount = draft.amount;
        match self.repo.append_entry(clinic_id, account_id, draft, self.policy).await {
            Ok(posting) => {
                info!(
                    %clinic_id,
                    %account_id,
                    kind = %kind,
                    %amount,
                    balance = %posting.account.current_balance,
                    "Ledger entry recorded"
                );
                Ok(posting)
            }
            Err(err) => {
                warn!(%clinic_id, %account_id, kind = %kind, %amount, error = %err, "Ledger entry rejected");
                Err(err)
            }
        }
    }

    /// Replay the ledger and compare it with the cached balance
    pub async fn verify_account(&self, clinic_id: Uuid, account_id: Uuid) -> KhataResult<LedgerVerification> {
        let account = self.get_account(clinic_id, account_id).await?;
        let entries = self.repo.list_entries(clinic_id, account_id).await?;
        let report = ledger::verify(&account, &entries);
        if !report.is_consistent {
            warn!(
                %account_id,
                cached = %report.cached_balance,
                computed = %report.computed_balance,
                mismatched = report.mismatched_entries.len(),
                "Ledger does not match cached balance"
            );
        }
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------

    pub async fn export_csv(&self, clinic_id: Uuid, account_id: Uuid) -> KhataResult<String> {
        let entries = self.repo.list_entries(clinic_id, account_id).await?;
        Ok(reporting::ledger_csv(&entries))
    }

    pub async fn statement(&self, clinic_id: Uuid, account_id: Uuid, clinic_name: &str) -> KhataResult<String> {
        let account = self.get_account(clinic_id, account_id).await?;
        let entries = self.repo.list_entries(clinic_id, account_id).await?;
        Ok(reporting::printable_statement(clinic_name, &account, &entries))
    }
}

fn required(value: &str, field: &str) -> KhataResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(KhataError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Digits with optional leading `+` and `-`/space separators, 7 to 15 digits
fn validate_phone(phone: &str) -> KhataResult<String> {
    let phone = phone.trim();
    let body = phone.strip_prefix('+').unwrap_or(phone);
    let well_formed = body.chars().all(|c| c.is_ascii_digit() || c == '-' || c == ' ');
    let digits = body.chars().filter(char::is_ascii_digit).count();
    if !well_formed || !(7..=15).contains(&digits) {
        return Err(KhataError::validation("phone number is malformed"));
    }
    Ok(phone.to_string())
}

fn validate_limit(limit: Decimal) -> KhataResult<()> {
    if limit < Decimal::ZERO {
        return Err(KhataError::validation("credit limit cannot be negative"));
    }
    ledger::ensure_currency(limit, "credit limit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryKhataRepository;

    fn service() -> KhataService {
        KhataService::new(Arc::new(InMemoryKhataRepository::new()), LedgerPolicy::default())
    }

    fn open_request(limit: i64) -> CreateAccountRequest {
        CreateAccountRequest {
            customer_name: "Bishnu Adhikari".to_string(),
            phone: "+977-9841234567".to_string(),
            address: Some("Lalitpur".to_string()),
            credit_limit: Decimal::from(limit),
            is_active: true,
        }
    }

    fn sale(amount: i64, sale_id: Option<Uuid>) -> RecordSaleRequest {
        RecordSaleRequest {
            amount: Decimal::from(amount),
            sale_id,
            description: Some("Medicines".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn account_validation() {
        let svc = service();
        let clinic = Uuid::new_v4();

        let mut bad_phone = open_request(0);
        bad_phone.phone = "98-abc".to_string();
        assert!(matches!(svc.create_account(clinic, bad_phone).await, Err(KhataError::Validation(_))));

        let mut no_name = open_request(0);
        no_name.customer_name = " ".to_string();
        assert!(matches!(svc.create_account(clinic, no_name).await, Err(KhataError::Validation(_))));

        assert!(matches!(
            svc.create_account(clinic, open_request(-1)).await,
            Err(KhataError::Validation(_))
        ));

        let mut fine_limit = open_request(0);
        fine_limit.credit_limit = "100.005".parse().unwrap();
        assert!(matches!(svc.create_account(clinic, fine_limit).await, Err(KhataError::Validation(_))));
    }

    #[tokio::test]
    async fn fractional_paisa_sale_leaves_ledger_untouched() {
        let svc = service();
        let clinic = Uuid::new_v4();
        let acc = svc.create_account(clinic, open_request(0)).await.unwrap();

        let mut tiny = sale(0, None);
        tiny.amount = "0.004".parse().unwrap();
        assert!(matches!(svc.record_sale(clinic, acc.id, tiny).await, Err(KhataError::Validation(_))));

        let detail = svc.get_account_detail(clinic, acc.id).await.unwrap();
        assert!(detail.transactions.is_empty());
        assert_eq!(detail.account.current_balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn sale_payment_refund_adjustment_flow() {
        let svc = service();
        let clinic = Uuid::new_v4();
        let acc = svc.create_account(clinic, open_request(5000)).await.unwrap();

        let sale_id = Uuid::new_v4();
        let posted = svc.record_sale(clinic, acc.id, sale(1200, Some(sale_id))).await.unwrap();
        assert_eq!(posted.account.current_balance, Decimal::from(1200));
        assert_eq!(posted.transaction.balance, Decimal::from(1200));

        let posted = svc
            .record_payment(
                clinic,
                acc.id,
                RecordPaymentRequest {
                    amount: Decimal::from(500),
                    notes: Some("cash".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(posted.account.current_balance, Decimal::from(700));

        svc.record_refund(
            clinic,
            acc.id,
            RecordRefundRequest {
                amount: Decimal::from(200),
                sale_id: Some(sale_id),
                notes: None,
            },
        )
        .await
        .unwrap();

        let posted = svc
            .record_adjustment(
                clinic,
                acc.id,
                RecordAdjustmentRequest {
                    amount: Decimal::from(-100),
                    description: None,
                    notes: Some("rounding".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(posted.transaction.direction, Direction::Credit);
        assert_eq!(posted.transaction.amount, Decimal::from(100));
        assert_eq!(posted.account.current_balance, Decimal::from(400));

        let detail = svc.get_account_detail(clinic, acc.id).await.unwrap();
        assert_eq!(detail.transactions.len(), 4);
        assert_eq!(detail.sales.len(), 1);
        assert_eq!(detail.sales[0].sale_id, sale_id);

        let report = svc.verify_account(clinic, acc.id).await.unwrap();
        assert!(report.is_consistent);
        assert_eq!(report.computed_balance, Decimal::from(400));
    }

    #[tokio::test]
    async fn overpayment_and_limit_are_rejected() {
        let svc = service();
        let clinic = Uuid::new_v4();
        let acc = svc.create_account(clinic, open_request(1000)).await.unwrap();
        svc.record_sale(clinic, acc.id, sale(800, None)).await.unwrap();

        let over = svc
            .record_payment(
                clinic,
                acc.id,
                RecordPaymentRequest {
                    amount: Decimal::from(801),
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(over.code(), Some("OVERPAYMENT"));

        let limit = svc.record_sale(clinic, acc.id, sale(300, None)).await.unwrap_err();
        assert_eq!(limit.code(), Some("CREDIT_LIMIT_EXCEEDED"));

        let zero = svc.record_sale(clinic, acc.id, sale(0, None)).await.unwrap_err();
        assert!(matches!(zero, KhataError::Validation(_)));

        assert_eq!(svc.get_account(clinic, acc.id).await.unwrap().current_balance, Decimal::from(800));
    }

    #[tokio::test]
    async fn update_never_touches_balance() {
        let svc = service();
        let clinic = Uuid::new_v4();
        let acc = svc.create_account(clinic, open_request(0)).await.unwrap();
        svc.record_sale(clinic, acc.id, sale(250, None)).await.unwrap();

        let updated = svc
            .update_account(
                clinic,
                acc.id,
                UpdateAccountRequest {
                    customer_name: Some("Bishnu K. Adhikari".to_string()),
                    credit_limit: Some(Decimal::from(2000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.customer_name, "Bishnu K. Adhikari");
        assert_eq!(updated.current_balance, Decimal::from(250));
    }

    #[tokio::test]
    async fn summary_and_exports() {
        let svc = service();
        let clinic = Uuid::new_v4();
        let a = svc.create_account(clinic, open_request(0)).await.unwrap();
        let b = svc.create_account(clinic, open_request(0)).await.unwrap();
        svc.record_sale(clinic, a.id, sale(300, None)).await.unwrap();
        svc.record_sale(clinic, b.id, sale(150, None)).await.unwrap();

        let summary = svc.summary(clinic).await.unwrap();
        assert_eq!(summary.total_accounts, 2);
        assert_eq!(summary.accounts_with_balance, 2);
        assert_eq!(summary.total_outstanding, Decimal::from(450));

        let csv = svc.export_csv(clinic, a.id).await.unwrap();
        assert!(csv.starts_with(reporting::CSV_HEADER));
        assert!(csv.contains(",SALE,Medicines,300.00,,300.00"));

        let text = svc.statement(clinic, a.id, "Sewa Clinic").await.unwrap();
        assert!(text.contains("Balance due: 300.00"));
    }
}
