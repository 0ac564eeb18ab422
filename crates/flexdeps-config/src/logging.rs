use serde::{Deserialize, Serialize};
use std::sync::Once;

use tracing_subscriber::prelude::*;

static TRACING_INIT: Once = Once::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level for all flexdeps crates.
    ///
    /// Either a simple level (`info`, `debug`, ...) or a full `EnvFilter`
    /// directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Write logs to stderr. When disabled nothing is emitted.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    /// Configured directives, with `warning` accepted for `warn`.
    fn level_directives(&self) -> String {
        match self.level.trim() {
            "" => Self::default_level(),
            level if level.eq_ignore_ascii_case("warning") => "warn".to_owned(),
            level => level.to_owned(),
        }
    }

    /// Create the effective `EnvFilter`: the configured level followed by
    /// `RUST_LOG`, so the environment wins where both name a target.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let mut directives = self.level_directives();
        if let Some(env) = std::env::var("RUST_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            directives = format!("{directives},{}", env.trim());
        }
        tracing_subscriber::EnvFilter::try_new(&directives)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(Self::default_level()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
        }
    }
}

/// Installs the global `tracing` subscriber.
///
/// Safe to call multiple times; only the first call has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        if !config.stderr {
            return;
        }

        let filter = config.env_filter();
        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_level(level: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn level_synonyms_are_normalized() {
        assert_eq!(with_level(" WARNING ").level_directives(), "warn");
        assert_eq!(with_level("").level_directives(), "info");
        assert_eq!(
            with_level("flexdeps.index=debug").level_directives(),
            "flexdeps.index=debug"
        );
    }
}
