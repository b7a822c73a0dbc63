//! Tracing setup for the release controller.
//!
//! The log filter is read from `RELEASE_LOG`, then `RUST_LOG`. When neither
//! is set, the configured level applies to the controller's own crates and
//! everything else logs at `warn`.

use tracing::{info, info_span, Level, Span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "RELEASE_LOG";

/// Crates whose events follow the configured level by default.
const CONTROLLER_TARGETS: [&str; 2] = ["release_core", "release_store"];

/// How a controller process reports.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    service: String,
    level: Level,
    json: bool,
}

impl TelemetryConfig {
    /// Human-readable output at `info` for `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            level: Level::INFO,
            json: false,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Emit newline-delimited JSON instead of human-readable lines.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Filter used when neither log variable is set.
    pub fn default_directives(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        let service_target = self.service.replace('-', "_");
        let mut directives = vec!["warn".to_string()];
        for target in CONTROLLER_TARGETS.iter().copied().chain([service_target.as_str()]) {
            directives.push(format!("{target}={level}"));
        }
        directives.join(",")
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(self.default_directives()))
    }

    /// Span wrapping the whole process, carrying the service identity into
    /// every event logged inside it.
    pub fn root_span(&self) -> Span {
        info_span!("service", name = %self.service, version = env!("CARGO_PKG_VERSION"))
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed; the process
/// keeps the first one.
pub fn init_tracing(config: &TelemetryConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.env_filter());
    let installed = if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
            .is_ok()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init().is_ok()
    };

    if installed {
        info!(service = %config.service, json = config.json, "tracing initialised");
    }
    installed
}
