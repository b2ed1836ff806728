//! Logging and tracing initialization.
//!
//! Export runs are long and mostly silent on stdout (the CLI owns the
//! progress line), so the config can route tracing output to a file
//! instead of the terminal.

use std::fs::File;
use std::sync::Mutex;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if let Some(file) = open_log_file(config) {
        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false);
        if config.json {
            tracing::subscriber::set_global_default(builder.json().finish()).ok();
        } else {
            tracing::subscriber::set_global_default(builder.finish()).ok();
        }
        return;
    }

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

/// Open the configured log file for appending. An unopenable path falls
/// back to terminal logging rather than failing startup.
fn open_log_file(config: &LoggingConfig) -> Option<File> {
    let path = config.file.as_ref()?;
    match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("vcrop: cannot open log file {}: {e}", path.display());
            None
        }
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
