//! Doctor appointment booking
//!
//! A doctor holds at most one BOOKED appointment for any instant: bookings
//! whose `[starts_at, ends_at)` window overlaps an existing one are rejected
//! with `SLOT_UNAVAILABLE`. Confirmations can be downloaded as `.ics` files.

pub mod error;
pub mod ics;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::*;
pub use models::*;
pub use postgres::PostgresAppointmentRepository;
pub use repository::{AppointmentRepository, InMemoryAppointmentRepository};
pub use service::{AppointmentConfig, AppointmentService};
