pub mod config;
mod error;
mod logging;
pub mod monitor;
pub mod runtime;

pub use error::AppError;

pub fn run() -> Result<(), AppError> {
    let config = bootstrap()?;

    tracing::info!(
        place_id = %config.place_id,
        poll_interval_secs = config.poll_interval_secs,
        probe_timeout_secs = config.probe_timeout_secs,
        http_bind = %config.http_bind,
        availability_log_path = %config.availability_log_path,
        device_tokens_path = %config.device_tokens_path,
        notifications_enabled = config.notifications.is_some(),
        "application bootstrap initialized"
    );

    runtime::run(config)
}

/// Loads `.env`, installs the subscriber and reads the configuration.
pub fn bootstrap() -> Result<config::AppConfig, AppError> {
    let dotenv_result = dotenvy::dotenv();
    logging::init()?;

    match dotenv_result {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
        Err(error) if error.not_found() => {}
        Err(error) => tracing::warn!(error = %error, "failed to load .env file"),
    }

    config::AppConfig::from_env()
}
