//! Application configuration
//!
//! [`DeliberationConfig`] holds the tunables the controller reads. It is
//! built by the infrastructure config loader from file and env sources.

pub mod deliberation_config;

pub use deliberation_config::DeliberationConfig;
