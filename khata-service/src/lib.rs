//! Pharmacy credit accounts (khata)
//!
//! Customers who buy on credit get an account whose balance is driven only by
//! an append-only ledger of SALE, PAYMENT, REFUND and ADJUSTMENT entries.
//! Every append stores the entry with the balance it produced and updates the
//! account's cached balance in the same atomic step, so
//! `current_balance == sum(signed amounts)` holds after every call.

pub mod error;
pub mod ledger;
pub mod models;
pub mod postgres;
pub mod reporting;
pub mod repository;
pub mod service;

pub use error::*;
pub use ledger::LedgerPolicy;
pub use models::*;
pub use postgres::PostgresKhataRepository;
pub use repository::{InMemoryKhataRepository, KhataRepository};
pub use service::KhataService;
