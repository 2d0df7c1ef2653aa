//! Infrastructure layer for jury-deliberation
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, plus configuration file loading.

pub mod config;
pub mod generator;
pub mod store;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileConfig, FileDeliberationConfig, FileGeneratorConfig, FileJurorConfig,
    FileServerConfig,
};
pub use generator::{JurorScript, ScriptLine, ScriptedSpeechGenerator};
pub use store::InMemorySessionStore;
