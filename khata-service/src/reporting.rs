//! Read-side projections of a ledger: CSV export and a printable statement.
//!
//! Both reproduce stored values only; nothing here recomputes balances.

use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write;

use crate::models::{CreditAccount, Direction, Transaction};

pub const CSV_HEADER: &str = "date,type,description,debit,credit,balance";

/// Two-decimal currency formatting, half away from zero
pub fn format_money(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn entry_text(entry: &Transaction) -> &str {
    entry
        .description
        .as_deref()
        .or(entry.notes.as_deref())
        .unwrap_or_default()
}

fn split_amount(entry: &Transaction) -> (String, String) {
    let amount = format_money(entry.amount);
    match entry.direction {
        Direction::Debit => (amount, String::new()),
        Direction::Credit => (String::new(), amount),
    }
}

/// CSV with one row per entry, oldest first. Lines end in CRLF.
pub fn ledger_csv(entries: &[Transaction]) -> String {
    let mut out = String::with_capacity(64 * (entries.len() + 1));
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");

    for entry in entries {
        let (debit, credit) = split_amount(entry);
        let row = [
            entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.kind.to_string(),
            csv_field(entry_text(entry)),
            debit,
            credit,
            format_money(entry.balance),
        ];
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }
    out
}

/// Fixed-width plain-text statement for printing
pub fn printable_statement(clinic_name: &str, account: &CreditAccount, entries: &[Transaction]) -> String {
    let mut out = String::new();
    let rule = "-".repeat(92);

    // writeln! into a String cannot fail
    let _ = writeln!(out, "{clinic_name}");
    let _ = writeln!(out, "Khata statement");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Customer : {}", account.customer_name);
    let _ = writeln!(out, "Phone    : {}", account.phone);
    if let Some(address) = &account.address {
        let _ = writeln!(out, "Address  : {address}");
    }
    if account.credit_limit > Decimal::ZERO {
        let _ = writeln!(out, "Limit    : {}", format_money(account.credit_limit));
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{:<17}{:<11}{:<28}{:>12}{:>12}{:>12}",
        "Date", "Type", "Description", "Debit", "Credit", "Balance"
    );
    let _ = writeln!(out, "{rule}");

    let (mut total_debit, mut total_credit) = (Decimal::ZERO, Decimal::ZERO);
    for entry in entries {
        match entry.direction {
            Direction::Debit => total_debit += entry.amount,
            Direction::Credit => total_credit += entry.amount,
        }
        let (debit, credit) = split_amount(entry);
        let text: String = entry_text(entry).chars().take(26).collect();
        let _ = writeln!(
            out,
            "{:<17}{:<11}{:<28}{:>12}{:>12}{:>12}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.kind.as_str(),
            text,
            debit,
            credit,
            format_money(entry.balance),
        );
    }

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{:<56}{:>12}{:>12}{:>12}",
        "Totals",
        format_money(total_debit),
        format_money(total_credit),
        format_money(account.current_balance),
    );
    let _ = writeln!(out, "Balance due: {}", format_money(account.current_balance));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn entry(kind: TransactionType, direction: Direction, amount: Decimal, balance: Decimal, description: &str) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            account_id: Uuid::nil(),
            sequence: 1,
            kind,
            direction,
            amount,
            balance,
            description: Some(description.to_string()),
            notes: None,
            sale_id: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap(),
        }
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(format_money(Decimal::from(12)), "12.00");
        assert_eq!(format_money(Decimal::new(12345, 3)), "12.35");
        assert_eq!(format_money(Decimal::new(-5, 1)), "-0.50");
    }

    #[test]
    fn csv_quotes_awkward_descriptions() {
        let rows = vec![
            entry(
                TransactionType::Sale,
                Direction::Debit,
                Decimal::new(45050, 2),
                Decimal::new(45050, 2),
                "Paracetamol, 2 strips",
            ),
            entry(
                TransactionType::Payment,
                Direction::Credit,
                Decimal::from(200),
                Decimal::new(25050, 2),
                "cash \"partial\"",
            ),
        ];
        let csv = ledger_csv(&rows);
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "2024-03-05 10:30:00,SALE,\"Paracetamol, 2 strips\",450.50,,450.50");
        assert_eq!(lines[2], "2024-03-05 10:30:00,PAYMENT,\"cash \"\"partial\"\"\",,200.00,250.50");
    }

    #[test]
    fn statement_totals_match_entries() {
        let now = Utc::now();
        let account = CreditAccount {
            id: Uuid::nil(),
            clinic_id: Uuid::nil(),
            customer_name: "Sita Sharma".to_string(),
            phone: "9801234567".to_string(),
            address: Some("Baneshwor".to_string()),
            credit_limit: Decimal::ZERO,
            current_balance: Decimal::new(25050, 2),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let rows = vec![
            entry(TransactionType::Sale, Direction::Debit, Decimal::new(45050, 2), Decimal::new(45050, 2), "Sale"),
            entry(TransactionType::Payment, Direction::Credit, Decimal::from(200), Decimal::new(25050, 2), "Cash"),
        ];
        let text = printable_statement("Sewa Clinic", &account, &rows);
        assert!(text.starts_with("Sewa Clinic\n"));
        assert!(text.contains("Sita Sharma"));
        assert!(text.contains("450.50"));
        assert!(text.contains("Balance due: 250.50"));
        assert!(!text.contains("Limit"));
    }
}
