//! certkeeper - Main entry point
//!
//! Certificate lifecycle daemon wrapping certbot.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use certkeeper::renewal::{
    run_timer, CertbotBackend, CycleRunner, PostCycleHook, RenewalScheduler, ShellHook,
    TriggerQueue,
};
use certkeeper::trigger::{spawn_signal_listener, DomainDirWatcher, ShutdownCoordinator};
use certkeeper_config::Settings;

/// certkeeper - keeps certbot certificates present, current and matching their names
#[derive(Parser, Debug)]
#[command(name = "certkeeper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Run a single cycle and exit (overrides ONCE)
    #[arg(long = "once")]
    once: bool,

    /// Validate configuration, print the managed domains and exit
    #[arg(long = "check")]
    check: bool,

    /// Log output format
    #[arg(long = "log-format", env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    let mut settings = Settings::from_env().context("Invalid configuration")?;
    if cli.once {
        settings.once = true;
    }

    if cli.check {
        return check_config(&settings);
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(run(Arc::new(settings)))
}

fn init_logging(verbose: bool, format: LogFormat) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Build the domain set once, print it and exit
fn check_config(settings: &Settings) -> Result<ExitCode> {
    let domains = settings
        .build_domain_set()
        .context("Domain configuration is invalid")?;

    info!(
        domain_count = domains.len(),
        plugin = %settings.plugin,
        cert_dir = %settings.cert_dir.display(),
        "Configuration test successful"
    );

    let json = serde_json::to_string_pretty(&domains).context("Failed to serialize domains")?;
    println!("{json}");

    Ok(ExitCode::SUCCESS)
}

async fn run(settings: Arc<Settings>) -> Result<ExitCode> {
    // Fail fast on a broken domain configuration before anything runs
    let domains = settings
        .build_domain_set()
        .context("Domain configuration is invalid")?;

    info!(
        domain_count = domains.len(),
        plugin = %settings.plugin,
        staging = settings.staging,
        once = settings.once,
        "Starting certkeeper"
    );

    let backend = Arc::new(
        CertbotBackend::new(settings.certbot.clone(), settings.plugin, settings.email.clone())
            .with_config_dir(settings.certbot_config_dir.clone()),
    );
    let hook = settings
        .hook
        .as_deref()
        .and_then(ShellHook::new)
        .map(|hook| Arc::new(hook) as Arc<dyn PostCycleHook>);

    let shutdown = ShutdownCoordinator::new();
    let (sender, queue) = TriggerQueue::channel();
    spawn_signal_listener(sender.clone(), shutdown.clone())
        .context("Failed to install signal handlers")?;

    let runner = CycleRunner::new(Arc::clone(&settings), backend, hook, shutdown.clone());

    if settings.once {
        let report = runner
            .run_cycle()
            .await
            .context("Domain configuration is invalid")?;
        if report.has_failures() {
            warn!(failed = report.failed_count(), "Some certificates could not be issued");
            return Ok(ExitCode::FAILURE);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let _watcher = match settings.watch_domain_dir() {
        Some(dir) => Some(
            DomainDirWatcher::start(dir, sender.clone()).context("Failed to watch domain directory")?,
        ),
        None => None,
    };

    let timer = tokio::spawn(run_timer(settings.check_interval, sender, shutdown.clone()));

    RenewalScheduler::new(runner, queue, shutdown).run().await;

    timer.abort();
    info!("certkeeper stopped");
    Ok(ExitCode::SUCCESS)
}
