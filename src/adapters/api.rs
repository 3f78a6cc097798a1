use std::sync::Arc;

use actix_web::{HttpResponse, Responder, get, post, web};
use serde::Serialize;
use serde_json::Value;

use crate::adapters::device_registry::DeviceRegistry;
use crate::app::monitor::StationMonitor;
use crate::domain::models::{StationStatus, timestamp_to_iso8601};

#[derive(Clone)]
pub struct ApiState {
    pub monitor: Arc<StationMonitor>,
    pub registry: Arc<DeviceRegistry>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct StatusResponse {
    pub available: bool,
    pub last_update_time: Option<String>,
    pub last_check: Option<String>,
    pub error: Option<String>,
}

impl From<StationStatus> for StatusResponse {
    fn from(status: StationStatus) -> Self {
        Self {
            available: status.available,
            last_update_time: status.last_update_time,
            last_check: status.last_check.map(timestamp_to_iso8601),
            error: status.error,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct HealthResponse {
    pub status: &'static str,
    pub last_check: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RegistrationResponse {
    pub success: bool,
    pub message: &'static str,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(get_status_endpoint)
        .service(check_now_endpoint)
        .service(register_device_token_endpoint);
}

#[get("/health")]
async fn health(state: web::Data<ApiState>) -> impl Responder {
    let snapshot = state.monitor.tracker().snapshot();
    HttpResponse::Ok().json(HealthResponse {
        status: "running",
        last_check: snapshot.last_check.map(timestamp_to_iso8601),
    })
}

#[get("/status")]
async fn get_status_endpoint(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(StatusResponse::from(state.monitor.tracker().snapshot()))
}

#[post("/check-now")]
async fn check_now_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let monitor = Arc::clone(&state.monitor);
    match web::block(move || monitor.run_cycle()).await {
        Ok(report) => HttpResponse::Ok().json(StatusResponse::from(report.status)),
        Err(error) => {
            tracing::warn!(error = %error, "on-demand check failed to run");
            error_response(format!("check failed to run: {error}"))
        }
    }
}

#[post("/api/device-token")]
async fn register_device_token_endpoint(
    state: web::Data<ApiState>,
    body: web::Bytes,
) -> impl Responder {
    let Some(device_token) = extract_device_token(&body) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "device_token is required"
        }));
    };

    let registry = Arc::clone(&state.registry);
    let token = device_token.clone();
    match web::block(move || registry.register(&token)).await {
        Ok(Ok(registration)) => {
            tracing::info!(
                device_token = %registration.token,
                registered_at = %registration.registered_at,
                "device token registered"
            );
            HttpResponse::Ok().json(RegistrationResponse {
                success: true,
                message: "Device token registered successfully",
            })
        }
        Ok(Err(error)) => {
            tracing::warn!(device_token = %device_token, error = %error, "device token registration failed");
            error_response(error.to_string())
        }
        Err(error) => error_response(error.to_string()),
    }
}

fn extract_device_token(body: &[u8]) -> Option<String> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    payload
        .get("device_token")?
        .as_str()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
}

fn error_response(message: String) -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({ "error": message }))
}
