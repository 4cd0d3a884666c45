use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// JSON logs to a daily rolling file under `log_dir`, or compact logs on
/// stderr when no directory is given. Stdout stays reserved for results.
pub fn init_tracing(log_dir: Option<&Path>) -> Result<(), String> {
    let Some(log_dir) = log_dir else {
        return tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .compact()
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|error| error.to_string());
    };

    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "tmssr.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
