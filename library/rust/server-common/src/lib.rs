//! movies-server-common: Shared server infrastructure for the movies service.
//!
//! Provides structured error codes following the `MOVIES_{ERROR}` pattern,
//! unified error response types, axum integration for HTTP error responses,
//! and the graceful shutdown signal used by server binaries.

pub mod error;
#[cfg(feature = "shutdown")]
pub mod shutdown;

pub use error::{ErrorBody, ErrorCode, ErrorDetail, ErrorResponse, ServiceError};
