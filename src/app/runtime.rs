use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, web};

use crate::adapters::api::{ApiState, configure_routes};
use crate::adapters::apns::{ApnsClient, ApnsEnvironment};
use crate::adapters::apns_credentials::FileCredentialIssuer;
use crate::adapters::availability_log::AvailabilityLog;
use crate::adapters::device_registry::DeviceRegistry;
use crate::adapters::places::{AvailabilityProbe, PlacesClient, PlacesHttpClient};
use crate::adapters::places_replay::PlacesReplayClient;
use crate::app::config::{AppConfig, NotificationConfig};
use crate::app::error::AppError;
use crate::app::monitor::{Notifier, StationMonitor, start_poller};
use crate::domain::status_tracker::StatusTracker;

pub fn build_places_client(config: &AppConfig) -> Result<Box<dyn PlacesClient>, AppError> {
    if let Some(replay_path) = &config.places_replay_path {
        tracing::info!(replay_path = %replay_path, "using scripted places replay");
        let client = PlacesReplayClient::from_file(replay_path)
            .map_err(|error| AppError::startup("places replay client", error))?;
        return Ok(Box::new(client));
    }

    let api_key = std::fs::read_to_string(&config.places_api_key_path).map_err(|error| {
        AppError::config(format!(
            "failed to read places api key from {}: {error}",
            config.places_api_key_path
        ))
    })?;

    let client = PlacesHttpClient::new(
        &config.places_base_url,
        &api_key,
        Duration::from_secs(config.probe_timeout_secs),
    )
    .map_err(AppError::config)?;
    Ok(Box::new(client))
}

fn build_notifier(
    settings: &NotificationConfig,
    registry: Arc<DeviceRegistry>,
) -> Result<Notifier, AppError> {
    let environment = ApnsEnvironment::from_sandbox_flag(settings.sandbox);
    let dispatcher = ApnsClient::new(
        environment,
        settings.bundle_id.clone(),
        Duration::from_secs(settings.timeout_secs),
    )
    .map_err(|error| AppError::startup("apns client", error))?;
    let issuer = FileCredentialIssuer::new(
        &settings.key_id_path,
        &settings.private_key_path,
        settings.team_id.clone(),
    );

    tracing::info!(
        apns_host = environment.host(),
        bundle_id = %settings.bundle_id,
        "push notifications enabled"
    );

    Ok(Notifier::new(
        Box::new(issuer),
        Box::new(dispatcher),
        registry,
        settings.message.clone(),
    ))
}

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let log = Arc::new(AvailabilityLog::new(&config.availability_log_path));
    match log.initialize() {
        Ok(true) => tracing::info!(path = %config.availability_log_path, "availability log created"),
        Ok(false) => {}
        Err(error) => tracing::warn!(error = %error, "failed to initialize availability log"),
    }

    let registry = Arc::new(DeviceRegistry::new(&config.device_tokens_path));
    let probe = AvailabilityProbe::new(build_places_client(&config)?, config.place_id.clone());

    let mut monitor = StationMonitor::new(probe, Arc::new(StatusTracker::new()), log);
    if let Some(settings) = &config.notifications {
        monitor = monitor.with_notifier(build_notifier(settings, Arc::clone(&registry))?);
    }
    let monitor = Arc::new(monitor);

    tracing::info!("running initial availability check");
    monitor.run_cycle();

    let poller = start_poller(
        Arc::clone(&monitor),
        Duration::from_secs(config.poll_interval_secs),
    )
    .map_err(|error| AppError::startup("availability poller", error))?;

    let api_state = ApiState {
        monitor: Arc::clone(&monitor),
        registry,
    };

    tracing::info!(bind = %config.http_bind, "http server starting");

    let server_result = actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(api_state.clone()))
                .configure(configure_routes)
        })
        .bind(&config.http_bind)?
        .run()
        .await
    });

    if poller.stop().is_err() {
        return Err(AppError::runtime("poller thread panicked"));
    }

    server_result.map_err(AppError::from)
}
