use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::{ControllerError, Result};

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// The log level to use
    pub level: Level,
    /// Whether to enable JSON formatting
    pub json: bool,
    /// Whether to include file and line information
    pub file_info: bool,
    /// Whether to log spans
    pub log_spans: bool,
    /// Application name to include in logs
    pub app_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: Level::INFO,
            json: false,
            file_info: false,
            log_spans: false,
            app_name: "mscontrol".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        LoggingConfig {
            level,
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Parse the level from a name such as "debug" or "warn"
    pub fn with_level_name(mut self, level: &str) -> Result<Self> {
        self.level = Level::from_str(level)
            .map_err(|e| ControllerError::Configuration(format!("Invalid log level {}: {}", level, e)))?;
        Ok(self)
    }

    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    pub fn with_spans(mut self) -> Self {
        self.log_spans = true;
        self
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` directives are honoured on top of the configured level.
/// Calling this twice returns a configuration error.
pub fn setup_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(config.level.into());

    let span_events = if config.log_spans {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| {
        ControllerError::Configuration(format!(
            "Failed to initialise logging for {}: {}",
            config.app_name, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsed_from_name() {
        let config = LoggingConfig::default().with_level_name("debug").unwrap().with_json();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.json);
        assert_eq!(config.app_name, "mscontrol");
    }

    #[test]
    fn unknown_level_name_is_rejected() {
        let err = LoggingConfig::default().with_level_name("chatty").unwrap_err();
        assert!(matches!(err, ControllerError::Configuration(_)));
    }
}
