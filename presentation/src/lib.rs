//! Presentation layer for jury-deliberation
//!
//! This crate contains the CLI definitions, console output for local runs,
//! and the HTTP command surface with its Server-Sent Events stream.

pub mod cli;
pub mod output;
pub mod server;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, OutputFormat};
pub use output::console::{ConsoleFormatter, TranscriptPrinter};
pub use server::{AppState, app_router};
