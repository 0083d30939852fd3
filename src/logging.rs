//! Tracing subscriber setup driven by [`LoggingConfig`]

use crate::config::LoggingConfig;
use crate::{Result, SproutError};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level; `verbose` forces `debug`.
/// Calling this twice is harmless, the second call is ignored.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(level),
    }
    .map_err(|e| SproutError::Configuration(format!("invalid log level: {}", e)))?;

    let writer = match config.target.as_str() {
        "stdout" => BoxMakeWriter::new(std::io::stdout),
        "stderr" => BoxMakeWriter::new(std::io::stderr),
        other => {
            return Err(SproutError::Configuration(format!(
                "unknown logging target '{}' (expected stdout or stderr)",
                other
            )));
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    let installed = match config.format.as_str() {
        "pretty" => builder.with_target(false).without_time().try_init(),
        "compact" => builder.compact().try_init(),
        "json" => builder.json().try_init(),
        other => {
            return Err(SproutError::Configuration(format!(
                "unknown logging format '{}' (expected pretty, compact or json)",
                other
            )));
        }
    };

    // Already installed (tests, embedding); keep the existing subscriber.
    let _ = installed;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format_rejected() {
        let config = LoggingConfig {
            format: "xml".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(init(&config, false), Err(SproutError::Configuration(_))));
    }

    #[test]
    fn test_unknown_target_rejected() {
        let config = LoggingConfig {
            target: "syslog".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(init(&config, false), Err(SproutError::Configuration(_))));
    }

    #[test]
    fn test_init_twice_is_ok() {
        let config = LoggingConfig::default();
        assert!(init(&config, false).is_ok());
        assert!(init(&config, true).is_ok());
    }
}
