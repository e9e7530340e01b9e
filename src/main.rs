//! neglb - HTTPS load balancers for network endpoint groups
//!
//! This is the main entry point for the neglb CLI.

mod cli;

use anyhow::Result;
use cli::output::OutputFormatter;
use cli::{Cli, Commands, RunArgs};
use neglb::config::{self, Config};
use neglb::executor::Provisioner;
use neglb::gcp::GcpClient;
use neglb::provider::ResourceKind;
use neglb::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    if cli.verbosity() >= 2 {
        eprintln!("neglb v{}", VERSION);
    }

    let output = OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity());

    let exit_code = match &cli.command {
        Commands::Run(args) => provision(&cli, args, false, &output).await?,
        Commands::Check(args) => provision(&cli, args, true, &output).await?,
        Commands::Validate => validate(&cli, &output)?,
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3),
        )
        .with(env_filter)
        .init();
}

/// Load and validate the config, reporting failures to the operator
fn load_config(cli: &Cli, output: &OutputFormatter) -> std::result::Result<Config, i32> {
    let path = config::config_path(cli.config.as_ref());
    Config::load(&path).map_err(|e| {
        tracing::error!("Failed to load config from {}: {}", path.display(), e);
        output.error(&e.to_string());
        e.exit_code()
    })
}

/// Run (or check) the provisioning steps
async fn provision(
    cli: &Cli,
    args: &RunArgs,
    force_check: bool,
    output: &OutputFormatter,
) -> Result<i32> {
    let config = match load_config(cli, output) {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };
    let options = args.options(force_check);

    let client = match GcpClient::builder_for(&config)
        .build_with_default_credentials()
        .await
    {
        Ok(client) => client,
        Err(e) => {
            output.error(&e.to_string());
            return Ok(e.exit_code());
        }
    };

    if options.check_mode {
        output.banner(&format!("NEGLB CHECK: {}", config.service));
    } else {
        output.banner(&format!("NEGLB RUN: {}", config.service));
    }

    let result = Provisioner::new(&client, &config)
        .with_options(options)
        .run_with(|step| output.step_result(step))
        .await;

    match result {
        Ok(report) => {
            output.recap(&report)?;
            Ok(0)
        }
        Err(e) => {
            if let Error::ManualStepRequired { command, .. } = e.root() {
                output.hint(&format!(
                    "Creating URL maps through the API is disabled. Run this instead, then re-run neglb:\n{}",
                    command
                ));
            }
            output.error(&e.to_string());
            Ok(e.exit_code())
        }
    }
}

/// Validate the config and list the resources a run manages
fn validate(cli: &Cli, output: &OutputFormatter) -> Result<i32> {
    let config = match load_config(cli, output) {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };

    let mut names: Vec<String> = ResourceKind::ALL
        .iter()
        .map(|kind| format!("{} ({})", config.resource_name(*kind), kind))
        .collect();
    names.push(format!("{} (A record in zone '{}')", config.dns_fqdn(), config.dns_zone));

    if output.is_json() {
        output.json(&serde_json::json!({
            "valid": true,
            "project": config.project,
            "service": config.service,
            "neg_pattern": config.neg_pattern(),
            "resources": names,
        }))?;
    } else {
        output.list(
            &format!("Configuration for '{}' in '{}' is valid", config.service, config.project),
            &names,
        );
        output.list(
            "NEGs registered",
            &[format!("names containing '{}'", config.neg_pattern())],
        );
    }

    Ok(0)
}
