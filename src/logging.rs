use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter: configured level for the crate, sqlx statement logs only on warn
pub fn filter_directives(config: &AppConfig) -> String {
    format!("{},sqlx=warn", config.log_level)
}

/// `hourly` / `daily`; anything else writes a single file
pub fn rotation(config: &AppConfig) -> Rotation {
    match config.rotation.as_str() {
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        _ => Rotation::NEVER,
    }
}

/// Install the global subscriber; keep the guard alive until exit
///
/// JSON output goes to the log file only. Text output goes to the file and,
/// with `log_stdout`, to an ANSI stdout layer for the admin CLI.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let appender = RollingFileAppender::new(rotation(config), &config.log_dir, &config.log_file);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
    } else {
        let stdout = config
            .log_stdout
            .then(|| fmt::layer().with_target(false).with_ansi(true));
        registry
            .with(fmt::layer().with_target(false).with_writer(writer).with_ansi(false))
            .with(stdout)
            .init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(extra: &str) -> AppConfig {
        AppConfig::from_yaml(&format!(
            "log_level: debug\nlog_dir: ./logs\nlog_file: x.log\nuse_json: true\n{}",
            extra
        ))
        .unwrap()
    }

    #[test]
    fn test_filter_directives() {
        let directives = filter_directives(&config("rotation: never\n"));
        assert_eq!(directives, "debug,sqlx=warn");
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_rotation() {
        assert_eq!(rotation(&config("rotation: hourly\n")), Rotation::HOURLY);
        assert_eq!(rotation(&config("rotation: daily\n")), Rotation::DAILY);
        assert_eq!(rotation(&config("rotation: weekly\n")), Rotation::NEVER);
    }

    #[test]
    fn test_stdout_can_be_disabled() {
        assert!(config("rotation: never\n").log_stdout);
        assert!(!config("rotation: never\nlog_stdout: false\n").log_stdout);
    }
}
