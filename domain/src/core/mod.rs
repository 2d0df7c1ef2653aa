//! Core domain concepts shared across all subdomains.
//!
//! - [`ids::SessionId`] / [`ids::JurorId`]: identifiers
//! - [`error::DeliberationError`]: command-level errors

pub mod error;
pub mod ids;
