//! Shipyard - Entry Point
//!
//! Deploys a service revision to a Nomad cluster and follows the rollout
//! until it succeeds or fails.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use tracing::{error, info};

use shipyard::app::options::DeployOptions;
use shipyard::app::run::run;
use shipyard::deploy::DeployOutcome;
use shipyard::errors::DeployError;
use shipyard::gateway::NomadConnector;
use shipyard::logs::{init_logging, LogLevel, LogOptions};
use shipyard::storage::layout::{ConfigLayout, KeyStrategy};
use shipyard::storage::settings::Settings;
use shipyard::terminal::{Reporter, TerminalReporter};
use shipyard::utils::{format_elapsed, version_info};

/// Shipyard command line
#[derive(Parser)]
#[command(name = "shipyard")]
#[command(about = "Deploy services to Nomad and supervise the rollout", long_about = None)]
struct Cli {
    /// Settings file path
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Show deployment descriptions and debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a service
    Deploy(DeployArgs),

    /// Print version information
    Version,
}

#[derive(Args)]
struct DeployArgs {
    /// Environment key
    #[arg(short, long)]
    environment: String,

    /// Service to deploy
    service: Option<String>,

    /// Image to deploy, the configured image when omitted
    #[arg(short, long)]
    image: Option<String>,

    /// Validate and print the job without submitting it
    #[arg(long)]
    dry_run: bool,

    /// Nomad address
    #[arg(long, env = "NOMAD_ADDR")]
    address: Option<String>,

    /// Nomad ACL token
    #[arg(long, env = "NOMAD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Configuration repository root
    #[arg(long)]
    root: Option<PathBuf>,

    /// Repository layout (environments, datacenters, deployments)
    #[arg(long)]
    layout: Option<KeyStrategy>,

    /// Do not record the deployed image in the configuration
    #[arg(long)]
    no_save: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let args = match cli.command {
        Commands::Version => {
            let version = version_info();
            match serde_json::to_string_pretty(&version) {
                Ok(json) => println!("{}", json),
                Err(_) => println!("{}", version.version),
            }
            return ExitCode::SUCCESS;
        }
        Commands::Deploy(args) => args,
    };

    let settings_file = Settings::locate(cli.settings.clone());
    let settings = match Settings::load(&settings_file).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_level = match (&cli.log_level, cli.verbose) {
        (Some(level), _) => level.clone(),
        (None, true) => LogLevel::Debug,
        (None, false) => settings.log_level.clone(),
    };
    let log_options = LogOptions {
        log_level,
        log_dir: Some(settings.log_dir.clone()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let reporter: Arc<dyn Reporter> = Arc::new(TerminalReporter::new(cli.verbose));
    let started = Instant::now();

    match deploy(&settings, args, reporter.clone()).await {
        Ok(DeployOutcome::DryRun(_)) => {
            reporter.success("Dry run, nothing submitted");
            ExitCode::SUCCESS
        }
        Ok(DeployOutcome::Succeeded { .. }) => {
            reporter.success(&format!("Done in {}", format_elapsed(started.elapsed())));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{}", e);
            if e
                .downcast_ref::<DeployError>()
                .is_some_and(DeployError::is_transient)
            {
                reporter.warning("Scheduler request failed, rerun the deploy to retry");
            }
            ExitCode::FAILURE
        }
    }
}

async fn deploy(
    settings: &Settings,
    args: DeployArgs,
    reporter: Arc<dyn Reporter>,
) -> anyhow::Result<DeployOutcome> {
    let service = args
        .service
        .context("a service name is required, e.g. `shipyard deploy -e prod api`")?;

    let mut options = DeployOptions::from_settings(settings, &args.environment, &service);
    options.image = args.image;
    options.dry_run = args.dry_run;
    options.save_config = !args.no_save;
    if let Some(address) = args.address {
        options.scheduler.address = address;
    }
    if let Some(token) = args.token {
        options.scheduler.token = Some(SecretString::from(token));
    }
    if args.root.is_some() || args.layout.is_some() {
        options.layout = ConfigLayout::new(
            args.root.unwrap_or(options.layout.root),
            args.layout.unwrap_or(options.layout.strategy),
        );
    }

    info!(
        "Deploying {} to {} via {}",
        options.service, options.environment, options.scheduler.address
    );
    let connector = NomadConnector::new(
        options.scheduler.token.clone(),
        options.scheduler.request_timeout,
    );
    let outcome = run(options, connector, reporter, await_shutdown_signal()).await?;
    Ok(outcome)
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Failed to install signal handlers");
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            return std::future::pending().await;
        }
        info!("Ctrl+C received, shutting down...");
    }
}
