use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::queue::RateLimiterConfig;
use crate::sink::console::CONSOLE_SINK_NAME;
use crate::sink::metrics::METRICS_SINK_NAME;

/// Top-level configuration for the event reader.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Logging verbosity (debug, info, warn, error). Default: "info".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Namespaces to watch. Empty means one cluster-wide watch.
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Worker tasks per controller. Default: 2.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Enabled sinks ("logs", "metrics"). Default: both.
    #[serde(default = "default_outputs")]
    pub outputs: Vec<String>,

    /// Console line template override. Empty selects the built-in JSON
    /// layout.
    #[serde(default)]
    pub format: String,

    /// Metrics exposition server configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Path to the sink filter file. Empty disables filtering.
    #[serde(default)]
    pub filters: String,

    /// Watch stream source: a file of JSON watch lines, empty for stdin.
    #[serde(default)]
    pub source: String,

    /// Watch ingestion throttle configuration.
    #[serde(default)]
    pub watch: WatchConfig,

    /// Upper bound on graceful shutdown. Default: 10s.
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Metrics exposition server configuration. The same listener also
/// serves GET /health.
#[derive(Debug, Deserialize)]
pub struct MetricsConfig {
    /// Listen port. Default: 9999.
    #[serde(default = "default_metrics_port")]
    pub port: u16,

    /// Exposition path. Default: "/metrics".
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

/// Watch ingestion throttle configuration, applied as the work queue's
/// overall token bucket.
#[derive(Debug, Deserialize)]
pub struct WatchConfig {
    /// Sustained enqueue rate in events per second. Default: 10.
    #[serde(default = "default_watch_qps")]
    pub qps: f64,

    /// Burst allowance on top of the sustained rate. Default: 100.
    #[serde(default = "default_watch_burst")]
    pub burst: f64,
}

// --- Default value functions ---

fn default_log_level() -> String {
    "info".to_string()
}

fn default_workers() -> usize {
    2
}

fn default_outputs() -> Vec<String> {
    vec![CONSOLE_SINK_NAME.to_string(), METRICS_SINK_NAME.to_string()]
}

fn default_metrics_port() -> u16 {
    9999
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_watch_qps() -> f64 {
    10.0
}

fn default_watch_burst() -> f64 {
    100.0
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

// --- Default trait impls ---

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            namespaces: Vec::new(),
            workers: default_workers(),
            outputs: default_outputs(),
            format: String::new(),
            metrics: MetricsConfig::default(),
            filters: String::new(),
            source: String::new(),
            watch: WatchConfig::default(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            qps: default_watch_qps(),
            burst: default_watch_burst(),
        }
    }
}

// --- Validation and loading ---

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate the configuration for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("workers must be positive");
        }

        if self.outputs.is_empty() {
            bail!("at least one output is required");
        }
        let mut seen = Vec::new();
        for output in &self.outputs {
            match output.as_str() {
                CONSOLE_SINK_NAME | METRICS_SINK_NAME => {}
                _ => bail!("unknown output: {output}"),
            }
            if seen.contains(&output) {
                bail!("output listed more than once: {output}");
            }
            seen.push(output);
        }

        let mut seen_namespaces = Vec::new();
        for namespace in &self.namespaces {
            if namespace.is_empty() {
                bail!("namespaces must not contain an empty entry");
            }
            if seen_namespaces.contains(&namespace) {
                bail!("namespace listed more than once: {namespace}");
            }
            seen_namespaces.push(namespace);
        }

        if self.source.is_empty() && self.namespaces.len() > 1 {
            bail!("watching multiple namespaces requires a file source; stdin has one reader");
        }

        if self.metrics.port == 0 {
            bail!("metrics.port must be positive");
        }
        if self.metrics.path.is_empty() {
            bail!("metrics.path is required");
        }

        if self.watch.qps <= 0.0 {
            bail!("watch.qps must be positive");
        }
        if self.watch.burst < 1.0 {
            bail!("watch.burst must be at least 1");
        }

        if self.shutdown_timeout.is_zero() {
            bail!("shutdown_timeout must be positive");
        }

        Ok(())
    }

    /// True when the named sink is enabled.
    pub fn output_enabled(&self, name: &str) -> bool {
        self.outputs.iter().any(|output| output == name)
    }

    /// Work queue rate limiter derived from the watch throttle settings.
    pub fn rate_limiter(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            bucket_qps: self.watch.qps,
            bucket_burst: self.watch.burst,
            ..RateLimiterConfig::default()
        }
    }

    /// Listen address for the metrics server.
    pub fn metrics_addr(&self) -> String {
        format!("0.0.0.0:{}", self.metrics.port)
    }
}
