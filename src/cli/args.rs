//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILE;
use crate::logger::LogLevel;
use crate::orchestrator::StartArgs;

/// Build editor color themes from declarative sources
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path, searched upward from the current directory
    #[arg(short = 'C', long, global = true, default_value = CONFIG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (silent, error, warn, info, verbose, silly)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile the themes into the extension package
    #[command(visible_alias = "c")]
    Compile,

    /// Link the compiled package into the editor's extensions directory
    #[command(visible_alias = "i")]
    Install {
        /// Do not report an existing installation
        #[arg(short, long)]
        silent: bool,
    },

    /// Watch theme sources, rebuilding and reinstalling on change
    #[command(visible_alias = "s")]
    Start {
        #[command(flatten)]
        args: WatchArgs,
    },

    /// Run the compiled package's install script in development mode
    Dev,
}

/// Overrides for the `[watch]` config section.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Minimum milliseconds between rebuild starts
    #[arg(long, value_name = "MS")]
    pub min_interval: Option<u64>,

    /// Milliseconds without new files before the first rebuild
    #[arg(long, value_name = "MS")]
    pub settle: Option<u64>,
}

impl From<&WatchArgs> for StartArgs {
    fn from(args: &WatchArgs) -> Self {
        Self {
            min_interval: args.min_interval,
            settle: args.settle,
        }
    }
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
    fn test_parse_start_overrides() {
        let cli = Cli::parse_from([
            "vsct",
            "--log-level",
            "silly",
            "start",
            "--min-interval",
            "250",
            "--settle",
            "800",
        ]);
        assert_eq!(cli.log_level, Some(LogLevel::Silly));
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));

        let Commands::Start { args } = &cli.command else {
            panic!("expected start");
        };
        let start = StartArgs::from(args);
        assert_eq!(start.min_interval, Some(250));
        assert_eq!(start.settle, Some(800));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["vsct", "install", "-s", "-v", "-C", "other.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(matches!(cli.command, Commands::Install { silent: true }));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        assert!(Cli::try_parse_from(["vsct", "--log-level", "loud", "compile"]).is_err());
    }
}
