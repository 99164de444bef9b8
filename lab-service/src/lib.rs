//! Lab orders and the public result lookup
//!
//! Patients fetch their results with the phone number on file and the order
//! number printed on their receipt (`LAB-YYYYMMDD-NNNN`). No clinic context
//! or login is involved, so the lookup must not leak whether an order number
//! exists when the phone does not match.

pub mod error;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::*;
pub use models::*;
pub use postgres::PostgresLabRepository;
pub use repository::{InMemoryLabRepository, LabRepository};
pub use service::LabService;
