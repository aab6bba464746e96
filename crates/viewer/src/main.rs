mod config;
mod error;
mod report;
mod session;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use engine::filter::FilterMode;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::{
    config::{LogFormat, LogOutput, OutputFormat, ViewerConfig},
    report::{export_raw, write_reports, write_tx_report},
    session::run_session,
    state::ViewerState,
};

#[derive(Parser, Debug)]
#[command(
    name = "vxview",
    version,
    about = "Group varnishlog output into transactions and show how they relate"
)]
struct Cli {
    /// Extra configuration file, layered over config/viewer.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read the capture script from a file
    #[arg(long, conflicts_with = "script")]
    script_file: Option<PathBuf>,

    /// Only show transactions whose summary matches (regex or preset name)
    #[arg(short, long)]
    filter: Option<String>,

    /// Hide transactions whose summary matches (regex or preset name)
    #[arg(long, conflicts_with = "filter")]
    exclude: Option<String>,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Skip the family reports printed after the capture
    #[arg(long)]
    no_report: bool,

    /// Write the raw lines of shown transactions to this file
    #[arg(long)]
    export_raw: Option<PathBuf>,

    /// Print the detailed report of one transaction after the capture
    #[arg(long = "tx", value_name = "TXID")]
    tx_report: Option<String>,

    /// Capture command, e.g. `vxview -- varnishlog -g session -r dump.vsl`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    script: Vec<String>,
}

impl Cli {
    /// Command line flags override the loaded configuration.
    fn apply(&self, config: &mut ViewerConfig) -> Result<()> {
        if let Some(path) = &self.script_file {
            config.script = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script file {}", path.display()))?;
        } else if !self.script.is_empty() {
            config.script = self.script.join(" ");
        }

        if let Some(filter) = &self.filter {
            config.output.filter = Some(filter.clone());
            config.output.filter_mode = FilterMode::Include;
        }
        if let Some(exclude) = &self.exclude {
            config.output.filter = Some(exclude.clone());
            config.output.filter_mode = FilterMode::Exclude;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if self.no_report {
            config.output.report = false;
        }
        if let Some(path) = &self.export_raw {
            config.output.export_raw = Some(path.display().to_string());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Phase 1: Basic tracing so we can log during config loading
    let basic_tracing = init_tracing_basic();

    let mut config = ViewerConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.apply(&mut config)?;
    config.validate().context("Configuration validation failed")?;

    // Phase 2: Re-initialize tracing with the configured format and output
    drop(basic_tracing);
    init_tracing_from_config(&config)?;

    info!("Starting vxview v{}", env!("CARGO_PKG_VERSION"));

    let mut state = ViewerState::from_config(&config.output)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let outcome = run_session(&config, &mut state, &mut out, shutdown_signal()).await;

    // Whatever was captured before a failure is still reported.
    if let Err(e) = &outcome {
        error!(error = %e, "capture failed");
        eprintln!("{e}");
    }

    if config.output.report && config.output.format != OutputFormat::Json {
        let families = write_reports(&state, &mut out).context("Failed to write reports")?;
        info!(families, "reports written");
    }
    if let Some(txid) = &cli.tx_report {
        if !write_tx_report(&state, txid, &mut out).context("Failed to write report")? {
            warn!(txid = %txid, "transaction not captured");
        }
    }
    out.flush()?;

    if let Some(path) = &config.output.export_raw {
        export_raw(&state, Path::new(path))
            .with_context(|| format!("Failed to export raw log to {path}"))?;
    }

    if let Some(filter) = state.filter() {
        let (scanned, matched, _) = filter.stats();
        info!(pattern = filter.pattern(), scanned, matched, "filter statistics");
    }

    match outcome {
        Ok(outcome) => {
            info!(?outcome, txs = state.store.len(), "vxview finished");
            Ok(())
        }
        Err(_) => std::process::exit(1),
    }
}

/// Phase 1: a thread-local subscriber used until the configuration is known.
fn init_tracing_basic() -> tracing::subscriber::DefaultGuard {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,viewer=debug"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_default(subscriber)
}

/// Phase 2: install the global subscriber described by `config.logging`.
fn init_tracing_from_config(config: &ViewerConfig) -> Result<()> {
    use std::sync::Arc;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Prefer RUST_LOG env var, fall back to config level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match (&config.logging.format, &config.logging.output) {
        (LogFormat::Json, LogOutput::Stderr) => {
            let layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        (LogFormat::Json, LogOutput::File { path }) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_writer(Arc::new(file));
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        (LogFormat::Pretty, LogOutput::Stderr) => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        (LogFormat::Pretty, LogOutput::File { path }) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Arc::new(file));
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
    Ok(())
}

fn open_log_file(path: &str) -> Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file '{path}'"))
}

/// Resolves on Ctrl+C or SIGTERM. If a handler cannot be installed that
/// signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, stopping capture...");
        },
        _ = terminate => {
            warn!("Received SIGTERM, stopping capture...");
        },
    }
}
