use crate::error::ReplyError;

/// Initialize structured logging with tracing.
/// Call once at startup; a second call returns an error.
pub fn init_logging() -> Result<(), ReplyError> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json() // JSON output for structured logging
        );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ReplyError::new(
            format!("Failed to set global tracing subscriber: {}", e),
            "startup"
        ))?;

    tracing::debug!("Structured logging initialized");
    Ok(())
}

pub fn log_completion_call(model: &str, success: bool, latency_ms: u64) {
    tracing::info!(
        model = model,
        success = success,
        latency_ms = latency_ms,
        "Completion call"
    );
}

pub fn log_timeout(model: &str, duration_secs: u64) {
    tracing::error!(model = model, duration_secs = duration_secs, "Timeout exceeded");
}
