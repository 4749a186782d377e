use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Initializes the logging system with console output and, when a log
/// directory is configured, a JSON file layer.
pub fn init_logging(config: &LoggingConfig) {
    // Determine filter: respect RUST_LOG if set; otherwise info for our crate
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("denial_analyzer=info,warn"));

    // Console goes to stderr so `--json` output on stdout stays parseable
    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let file_layer = config.log_dir.as_ref().and_then(|dir| {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("⚠️  Could not create log directory {}: {}", dir.display(), e);
            return None;
        }

        // Create a non-blocking file appender for daily log rotation
        let file_appender = tracing_appender::rolling::daily(dir, &config.file_name);
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

        // We need to keep the guard alive to ensure logs are flushed on exit
        std::mem::forget(guard);

        Some(fmt::layer().json().with_writer(non_blocking_writer))
    });

    // Set the global default subscriber; a second init (tests) is ignored
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
