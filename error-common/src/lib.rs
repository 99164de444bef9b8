//! Common error handling utilities for the Sewa clinic engine
//!
//! Two things live here:
//!
//! - **Error codes**: the stable strings (`NO_CLINIC`, `SLOT_UNAVAILABLE`, ...)
//!   that every service attaches to conflicts and validation failures, so the
//!   HTTP layer and its clients see one vocabulary.
//! - **`ClinicError`**: the process-level error used by binaries around
//!   start-up, configuration and serving.
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, ClinicError};
//!
//! fn port_from_env(raw: &str) -> Result<u16, ClinicError> {
//!     raw.parse()
//!         .map_err(|_| ClinicError::ConfigError(format!("invalid port: {raw}")))
//! }
//!
//! assert!(port_from_env("eighty").is_err());
//! assert_eq!(codes::ipd::SLOT_UNAVAILABLE, "SLOT_UNAVAILABLE");
//! ```

pub mod codes;
pub mod types;

pub use types::*;
