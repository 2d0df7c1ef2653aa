//! Configuration file loading for jury-deliberation
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `JURY_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./jury.toml` or `./.jury.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/jury-deliberation/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    DEFAULT_BIND, FileConfig, FileDeliberationConfig, FileGeneratorConfig, FileJurorConfig,
    FileServerConfig, FileSpeechLine, default_jurors,
};
pub use loader::ConfigLoader;
