//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Run profile handlers as intercepted boundary operations.
//! - Map engine failures onto HTTP statuses.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
