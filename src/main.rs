#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use gridserver_exporter::{Exporter, exporter::server};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const PIDFILE_HELP: &str = "Path to GridServer Manager PID file.

If provided, the standard process metrics get exported for the Manager process, prefixed with \
'gridserver_process_...'. The exporter needs read access to files owned by the Manager process. \
Depends on the availability of /proc.";

#[derive(Parser, Debug)]
#[command(name = "gridserver-exporter")]
#[command(author, version, about = "Prometheus exporter for TIBCO GridServer")]
struct Cli {
    /// URL for reporting database or Web Services (SOAP).
    #[arg(short, long, env = "GRIDSERVER_URL", value_name = "URL")]
    url: String,

    /// Address to listen on for web interface and telemetry.
    #[arg(short, long, default_value = "0.0.0.0:9336")]
    listen_address: String,

    /// Path under which to expose metrics.
    #[arg(long, default_value = "/metrics")]
    telemetry_path: String,

    /// Enable TLS certificate verification for the Web Services URL (default).
    #[arg(long, overrides_with = "no_tls_verify")]
    tls_verify: bool,

    /// Disable TLS certificate verification for the Web Services URL.
    #[arg(long, overrides_with = "tls_verify")]
    no_tls_verify: bool,

    /// Schema name for reporting database.
    #[arg(short, long, value_name = "SCHEMA")]
    schema: Option<String>,

    /// Timeout for each request to GridServer, e.g. `5s` or `1500ms`.
    #[arg(short, long, default_value = "5s", value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// Collect services and tasks from the Director only, not from every Broker.
    #[arg(long)]
    director_only: bool,

    /// Seed for reproducible `mock://` data.
    #[arg(long, hide = true)]
    mock_seed: Option<u64>,

    /// Fetch metrics once, then exit.
    #[arg(long)]
    once: bool,

    #[arg(short, long, value_name = "FILENAME", long_help = PIDFILE_HELP)]
    pidfile: Option<PathBuf>,

    /// Log level or filter directives; overridden by RUST_LOG.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Shorthand for `--log-level debug`.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn tls_verify(&self) -> bool {
        self.tls_verify || !self.no_tls_verify
    }

    fn log_filter(&self) -> EnvFilter {
        let level = if self.verbose { "debug" } else { &self.log_level };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }

    /// Accepts the `:port` shorthand for all interfaces.
    fn listen_address(&self) -> String {
        match self.listen_address.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{}", port),
            None => self.listen_address.clone(),
        }
    }

    fn build_exporter(&self) -> gridserver_exporter::ExporterResult<Exporter> {
        let mut builder = Exporter::builder()
            .url(self.url.as_str())
            .tls_verify(self.tls_verify())
            .timeout(self.timeout)
            .director_only(self.director_only);
        if let Some(schema) = &self.schema {
            builder = builder.schema(schema.as_str());
        }
        if let Some(seed) = self.mock_seed {
            builder = builder.mock_seed(seed);
        }
        if let Some(pidfile) = &self.pidfile {
            builder = builder.pidfile(pidfile.clone());
        }
        builder.build()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_filter())
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting GridServer Exporter");

    let exporter = cli.build_exporter().context("Start failed")?;

    if cli.once {
        return fetch_once(&exporter).await;
    }

    let router = server::create_router(Arc::new(exporter), &cli.telemetry_path)?;
    let address = cli.listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Cannot listen on {}", address))?;
    info!(address = %address, telemetry_path = %cli.telemetry_path, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn fetch_once(exporter: &Exporter) -> Result<()> {
    let start = Instant::now();
    let result = exporter.fetch_once().await;
    let elapsed = start.elapsed();

    match result {
        Ok(snapshot) => {
            info!(
                ?elapsed,
                snapshot = %serde_json::to_string(&snapshot)?,
                "Fetch succeeded"
            );
            Ok(())
        }
        Err(e) => {
            error!(?elapsed, error = %e, "Fetch failed");
            Err(e).context("Fetch failed")
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
