use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use kube_events_reader::config::Config;
use kube_events_reader::controller::{EventController, JsonStreamWatcher};
use kube_events_reader::export::MetricsServer;
use kube_events_reader::filter::{FilterConfig, RuleSet};
use kube_events_reader::format::EventTemplate;
use kube_events_reader::shutdown::{shutdown, Finalizer};
use kube_events_reader::sink::console::CONSOLE_SINK_NAME;
use kube_events_reader::sink::metrics::METRICS_SINK_NAME;
use kube_events_reader::sink::{ConsoleSink, MetricsSink, Sink};

/// Kubernetes Event reader: watches the event stream, classifies events,
/// and fans them out to console and Prometheus sinks.
#[derive(Parser)]
#[command(name = "kube-events-reader", about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    /// Overrides the config file's log_level.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print version information and exit.
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Version) = &cli.command {
        println!("kube-events-reader {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let cfg = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    let log_level = cli.log_level.as_ref().unwrap_or(&cfg.log_level);
    let filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("invalid log level: {log_level}"))?;
    fmt().with_env_filter(filter).with_target(true).init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting kube-events-reader",
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(async { run(cfg).await })
}

async fn run(cfg: Config) -> Result<()> {
    let token = CancellationToken::new();

    {
        let token = token.clone();
        tokio::spawn(async move {
            let ctrl_c = tokio::signal::ctrl_c();
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    tracing::info!("received SIGINT, shutting down");
                }
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM, shutting down");
                }
            }
            token.cancel();
        });
    }

    let filters = if cfg.filters.is_empty() {
        FilterConfig::default()
    } else {
        FilterConfig::load(std::path::Path::new(&cfg.filters)).context("loading filters")?
    };

    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();
    let mut server = None;

    if cfg.output_enabled(CONSOLE_SINK_NAME) {
        let rules = RuleSet::compile(filters.sink_filters(CONSOLE_SINK_NAME))
            .context("compiling console sink filters")?;
        let template = EventTemplate::parse(&cfg.format).context("parsing console format")?;
        sinks.push(Arc::new(ConsoleSink::new(rules, template)));
    }

    if cfg.output_enabled(METRICS_SINK_NAME) {
        let rules = RuleSet::compile(filters.sink_filters(METRICS_SINK_NAME))
            .context("compiling metrics sink filters")?;
        let sink = Arc::new(MetricsSink::new(rules).context("building metrics sink")?);

        let metrics_server = MetricsServer::new(
            cfg.metrics_addr(),
            cfg.metrics.path.clone(),
            sink.registry().clone(),
        );
        metrics_server
            .start()
            .await
            .context("starting metrics server")?;
        server = Some(Arc::new(metrics_server));
        sinks.push(sink);
    }

    let sinks = Arc::new(sinks);
    let watcher = if cfg.source.is_empty() {
        Arc::new(JsonStreamWatcher::stdin())
    } else {
        Arc::new(JsonStreamWatcher::from_path(&cfg.source))
    };

    // One cluster-wide controller, or one per configured namespace.
    let namespaces = if cfg.namespaces.is_empty() {
        vec![String::new()]
    } else {
        cfg.namespaces.clone()
    };

    let mut handles = Vec::with_capacity(namespaces.len());
    for namespace in namespaces {
        let controller = EventController::new(
            namespace,
            Arc::clone(&watcher),
            Arc::clone(&sinks),
            cfg.rate_limiter(),
        );
        let token = token.clone();
        let workers = cfg.workers;
        handles.push(tokio::spawn(async move {
            controller.run(workers, token).await
        }));
    }

    for handle in handles {
        handle.await.context("joining controller task")??;
    }

    let mut finalizers = Vec::new();
    if let Some(server) = server {
        finalizers.push(Finalizer::new("metrics server", async move {
            server.stop().await
        }));
    }
    shutdown(cfg.shutdown_timeout, finalizers).await?;

    tracing::info!("kube-events-reader stopped");

    Ok(())
}
