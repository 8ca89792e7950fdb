//! Tracing subscriber installation
//!
//! `RUST_LOG` always wins over the configured default directive.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::Environment;

/// How log lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// One line per event
    Compact,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub default_directive: String,
    pub format: LogFormat,
    /// Log span open and close (connection tasks are long lived; noisy)
    pub span_lifecycle: bool,
    pub source_location: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_directive: "info".to_string(),
            format: LogFormat::Compact,
            span_lifecycle: false,
            source_location: false,
        }
    }
}

impl TracingConfig {
    /// Verbose output for the gateway crates, quieter dependencies
    #[must_use]
    pub fn development() -> Self {
        Self {
            default_directive: "info,guildlink_gateway=debug,guildlink_cache=debug".to_string(),
            format: LogFormat::Pretty,
            span_lifecycle: true,
            source_location: true,
        }
    }

    #[must_use]
    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Development => Self::development(),
            Environment::Staging => Self::default(),
            Environment::Production => Self::production(),
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_directive))
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let spans = if self.span_lifecycle {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let base = fmt::layer()
            .with_span_events(spans)
            .with_file(self.source_location)
            .with_line_number(self.source_location);

        match self.format {
            LogFormat::Pretty => base.pretty().boxed(),
            LogFormat::Compact => base.compact().boxed(),
            LogFormat::Json => base.json().boxed(),
        }
    }
}

/// Install the default subscriber
pub fn try_init_tracing() -> Result<(), TracingError> {
    try_init_tracing_with_config(TracingConfig::default())
}

/// Install a subscriber built from `config`
///
/// Fails instead of panicking when a global subscriber already exists.
pub fn try_init_tracing_with_config(config: TracingConfig) -> Result<(), TracingError> {
    tracing_subscriber::registry()
        .with(config.layer())
        .with(config.filter())
        .try_init()
        .map_err(|_| TracingError::AlreadyInitialized)
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}
