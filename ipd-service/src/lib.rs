//! In-patient department (IPD) management
//!
//! Wards group beds; beds carry a status driven by the state machine in
//! [`status`]; admissions link a patient to a bed. The core guarantee is that
//! a bed never holds more than one open admission: the availability check and
//! the flip to OCCUPIED happen inside a single repository call that is atomic
//! per bed in every backend.

pub mod error;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod rules;
pub mod service;
pub mod status;

pub use error::*;
pub use models::*;
pub use postgres::PostgresIpdRepository;
pub use repository::{InMemoryIpdRepository, IpdRepository};
pub use service::{IpdConfig, IpdService};
pub use status::BedEvent;
