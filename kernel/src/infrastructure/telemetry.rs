use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::infrastructure::config::TelemetrySettings;

/// Builder for setting up telemetry (logging and metrics).
pub struct TelemetryBuilder {
    service_name: String,
    log_level: String,
    json: bool,
    enable_metrics: bool,
}

impl TelemetryBuilder {
    /// Starts a builder for `service_name` logging at `info`.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_level: "info".to_string(),
            json: false,
            enable_metrics: false,
        }
    }

    /// Starts a builder from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &TelemetrySettings) -> Self {
        Self::new(settings.service_name.clone())
            .with_log_level(settings.log_level.clone())
            .with_json(settings.json)
    }

    /// Sets the default filter directive. `RUST_LOG` still takes precedence.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Switches log output to JSON lines.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Installs a Prometheus recorder for the dispatcher's counters.
    #[must_use]
    pub fn with_metrics(mut self) -> Self {
        self.enable_metrics = true;
        self
    }

    /// Initializes the global subscriber and, if enabled, the metrics
    /// recorder. Returns the handle used to render collected metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The tracing subscriber cannot be initialized
    /// - The Prometheus recorder cannot be installed
    pub fn init(self) -> Result<Option<PrometheusHandle>> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        let fmt_layer = if self.json {
            fmt::layer().json().with_span_events(FmtSpan::CLOSE).boxed()
        } else {
            fmt::layer().with_target(true).boxed()
        };

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .context("Failed to init subscriber")?;

        if !self.enable_metrics {
            return Ok(None);
        }

        let handle = PrometheusBuilder::new()
            .add_global_label("service", self.service_name)
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Ok(Some(handle))
    }
}
