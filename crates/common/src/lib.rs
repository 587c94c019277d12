//! Wire types and service errors shared between `fieldcrypt` hosts.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
