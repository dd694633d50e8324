// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `livecap`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "livecap",
    version,
    about = "Record live streams with an external capture tool.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Livecap.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LIVECAP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Also write daily-rotated log files here. Overrides `[config].log_dir`.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Parse + validate, print the capture commands, but don't start anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Record only the `[stream.<NAME>]` section with this name.
    #[arg(long, value_name = "NAME")]
    pub only: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["livecap"]).unwrap();
        assert_eq!(args.config, default_config_path());
        assert_eq!(args.config, PathBuf::from("Livecap.toml"));
        assert!(args.log_level.is_none());
        assert!(!args.dry_run);
        assert!(args.only.is_none());
    }

    #[test]
    fn all_flags() {
        let args = CliArgs::try_parse_from([
            "livecap",
            "--config",
            "rooms.toml",
            "--log-level",
            "debug",
            "--log-dir",
            "logs",
            "--dry-run",
            "--only",
            "night",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("rooms.toml"));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert_eq!(args.log_dir, Some(PathBuf::from("logs")));
        assert!(args.dry_run);
        assert_eq!(args.only.as_deref(), Some("night"));
    }
}
