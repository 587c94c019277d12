//! Structured logging setup.
//!
//! # Telemetry invariants
//!
//! - **No plaintext field values or key material** may appear in any log
//!   field. Locations (`Profile.phone`) and type names are fine.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`) and
//!   overridable with `RUST_LOG`.

pub mod init;

pub use init::init_telemetry;
