//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "jury-deliberation";
const PROJECT_FILES: [&str; 2] = ["jury.toml", ".jury.toml"];
const ENV_PREFIX: &str = "JURY_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `JURY_*` environment variables (`__` separates sections,
    ///    e.g. `JURY_DELIBERATION__TOTAL_ROUNDS=6`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./jury.toml` or `./.jury.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/jury-deliberation/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(&path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// Load a single file over the defaults, ignoring every other source
    pub fn load_file(path: &Path) -> Result<FileConfig, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(FileConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/jury-deliberation/config.toml if set,
    /// otherwise falls back to ~/.config/jury-deliberation/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(config_path: Option<&PathBuf>) {
        println!("Configuration sources (in priority order):");

        println!("  [ENV  ] Environment: {ENV_PREFIX}* (e.g. {ENV_PREFIX}SERVER__BIND)");

        if let Some(path) = config_path {
            let mark = if path.exists() { "FOUND" } else { "MISS " };
            println!("  [{mark}] Explicit: {}", path.display());
        }

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./jury.toml or ./.jury.toml");
        }

        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                println!("  [FOUND] Global:  {}", path.display());
            } else {
                println!("  [     ] Global:  {}", path.display());
            }
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.deliberation.total_rounds, 4);
        assert!(config.jurors.is_empty());
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains(APP_DIR));
    }

    #[test]
    fn test_load_file_merges_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[deliberation]\ntotal_rounds = 7\nnote_window_ms = 0\n\n[server]\nbind = \"127.0.0.1:3000\""
        )
        .unwrap();

        let config = ConfigLoader::load_file(file.path()).unwrap();
        assert_eq!(config.deliberation.total_rounds, 7);
        assert_eq!(config.deliberation.note_window_ms, 0);
        assert_eq!(config.deliberation.max_notes, 3);
        assert_eq!(config.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_load_file_rejects_bad_types() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[deliberation]\ntotal_rounds = \"many\"").unwrap();
        assert!(ConfigLoader::load_file(file.path()).is_err());
    }

    #[test]
    fn test_explicit_path_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[generator]\nchunk_chars = 3").unwrap();
        let path = file.path().to_path_buf();

        let config = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(config.generator.chunk_chars, 3);
    }
}
