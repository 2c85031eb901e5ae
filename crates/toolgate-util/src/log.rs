//! Tracing setup for embedding applications.
//!
//! The core crates only emit `tracing` events; installing a subscriber is
//! the embedder's job, and this module gives it one consistent way to do
//! so. The `TOOLGATE_LOG` environment variable overrides the configured
//! directive with full `EnvFilter` syntax.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable consulted before the configured directive.
pub const LOG_ENV_VAR: &str = "TOOLGATE_LOG";

/// Subscriber options.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Default filter directive, e.g. `info` or `toolgate_core=debug`.
    pub directive: String,
    /// Write formatted events to stderr. When false only the filter is
    /// installed, so spans still propagate to other layers.
    pub stderr: bool,
    /// Include file and line numbers in formatted events.
    pub include_location: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            directive: "info".to_string(),
            stderr: true,
            include_location: false,
        }
    }
}

impl LogOptions {
    /// Options with a specific default directive.
    pub fn with_directive(directive: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
            ..Self::default()
        }
    }

    /// Quiet options: filter only, no stderr output.
    pub fn quiet() -> Self {
        Self {
            stderr: false,
            ..Self::default()
        }
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init(options: LogOptions) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(&options.directive));
    let registry = tracing_subscriber::registry().with(filter);

    if options.stderr {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(options.include_location)
            .with_line_number(options.include_location);
        registry.with(layer).init();
    } else {
        registry.init();
    }
}
