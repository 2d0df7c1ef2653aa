//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for a local debate run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored transcript
    Pretty,
    /// One JSON object per event
    Json,
}

/// CLI arguments for jury-deliberation
#[derive(Parser, Debug)]
#[command(name = "jury-deliberation")]
#[command(author, version, about = "Jury deliberation engine - streamed, round-based juror debate")]
#[command(long_about = r#"
Runs a round-based debate among simulated jurors and streams it as events.

Each round one juror leads and up to two others respond. Between rounds a
note window lets the observer pass a note to one juror (3 per debate by
default). After the last round the debate ends.

Configuration files are loaded from (in priority order):
1. JURY_* environment variables
2. --config <path>     Explicit config file
3. ./jury.toml         Project-level config
4. ~/.config/jury-deliberation/config.toml   Global config

Example:
  jury-deliberation serve
  jury-deliberation run --skip-after-round 2
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long, global = true)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP command surface and event stream
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Play one debate locally with the scripted cast and print its events
    Run {
        /// Rounds to play (overrides deliberation.total_rounds)
        #[arg(short, long)]
        rounds: Option<u32>,

        /// Skip the debate once this round's note window opens
        #[arg(long, value_name = "N")]
        skip_after_round: Option<u32>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_skip() {
        let cli = Cli::parse_from([
            "jury-deliberation",
            "-vv",
            "run",
            "--skip-after-round",
            "2",
            "--output",
            "json",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.command,
            Command::Run {
                rounds: None,
                skip_after_round: Some(2),
                output: OutputFormat::Json,
            }
        );
    }

    #[test]
    fn test_parse_serve_with_global_flags() {
        let cli = Cli::parse_from(["jury-deliberation", "serve", "--no-config", "--bind", "0.0.0.0:9000"]);
        assert!(cli.no_config);
        assert_eq!(
            cli.command,
            Command::Serve {
                bind: Some("0.0.0.0:9000".to_string())
            }
        );
    }
}
