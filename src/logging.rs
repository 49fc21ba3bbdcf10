use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Wallet HTTP internals are noisy at debug
const QUIET_TRANSPORT: &str = "hyper=warn,reqwest=warn";

fn log_directives(level: &str) -> String {
    format!("{level},{QUIET_TRANSPORT}")
}

fn rolling_appender(config: &AppConfig) -> RollingFileAppender {
    let (dir, file) = (&config.log_dir, &config.log_file);
    match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(dir, file),
        "daily" => tracing_appender::rolling::daily(dir, file),
        _ => tracing_appender::rolling::never(dir, file),
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `log_level`.
///
/// JSON mode writes only the rolling file (deal and transfer fields stay
/// machine-readable); text mode also echoes to stdout. Keep the returned
/// guard alive until exit or buffered lines are lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(rolling_appender(config));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directives(&config.log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        registry
            .with(fmt::layer().json().with_writer(writer).with_ansi(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(writer).with_ansi(false))
            .with(fmt::layer().with_target(false))
            .init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_crates_stay_quiet() {
        let directives = log_directives("debug");
        assert_eq!(directives, "debug,hyper=warn,reqwest=warn");
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
