//! CLI module for neglb
//!
//! Argument parsing and subcommand definitions.

pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use neglb::config::UrlMapMode;
use neglb::executor::RunOptions;
use std::path::PathBuf;
use std::time::Duration;

/// neglb - provision an HTTPS load balancer for a service's NEGs
#[derive(Parser, Debug, Clone)]
#[command(name = "neglb")]
#[command(author = "neglb Contributors")]
#[command(version)]
#[command(about = "Idempotently provision a GCP HTTPS load balancer for a service", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file
    #[arg(short = 'c', long, global = true, env = "NEGLB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Provision the load balancer
    Run(RunArgs),

    /// Show what a run would create without changing anything
    Check(RunArgs),

    /// Validate the configuration and print the managed resource names
    Validate,
}

/// Arguments for run and check
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Run in check mode (dry-run, don't make changes)
    #[arg(long = "check")]
    pub check_mode: bool,

    /// How to handle a missing URL map (overrides the config)
    #[arg(long, value_enum)]
    pub url_map_mode: Option<UrlMapMode>,

    /// Seconds to wait after each create call (overrides the config)
    #[arg(long)]
    pub settle_secs: Option<u64>,
}

impl RunArgs {
    /// Run options for the provisioner
    pub fn options(&self, force_check: bool) -> RunOptions {
        RunOptions {
            check_mode: self.check_mode || force_check,
            settle_delay: self.settle_secs.map(Duration::from_secs),
            url_map_mode: self.url_map_mode,
        }
    }
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "neglb",
            "run",
            "--url-map-mode",
            "manual",
            "--settle-secs",
            "0",
            "-c",
            "lb.yaml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("lb.yaml")));
        let Commands::Run(args) = &cli.command else {
            panic!("expected run");
        };
        let options = args.options(false);
        assert!(!options.check_mode);
        assert_eq!(options.url_map_mode, Some(UrlMapMode::Manual));
        assert_eq!(options.settle_delay, Some(Duration::ZERO));
    }

    #[test]
    fn test_check_forces_check_mode() {
        let cli = Cli::try_parse_from(["neglb", "check", "--output", "json"]).unwrap();
        assert!(cli.is_json());
        let Commands::Check(args) = &cli.command else {
            panic!("expected check");
        };
        assert!(args.options(true).check_mode);
    }

    #[test]
    fn test_verbosity_is_capped() {
        let cli = Cli::try_parse_from(["neglb", "-vvvvv", "validate"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }
}
