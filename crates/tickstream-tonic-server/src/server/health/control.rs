//! HTTP control surface for flipping the whole-service health.
//!
//! `/toggle-health` accepts any method and carries no body. Each call flips
//! the [`HealthRegister`]; calling it twice restores the previous status.

use crate::server::{health::register::HealthRegister, telemetry::increment_health_toggles};
use axum::{Router, extract::State, routing::any};
use std::sync::Arc;

pub const TOGGLE_HEALTH_PATH: &str = "/toggle-health";

/// Builds the control router over a shared register.
pub fn router(register: Arc<HealthRegister>) -> Router {
    Router::new()
        .route(TOGGLE_HEALTH_PATH, any(toggle_health))
        .with_state(register)
}

/// Flips the health status and reports the result as plain text.
#[tracing::instrument(skip_all)]
pub async fn toggle_health(State(register): State<Arc<HealthRegister>>) -> String {
    let status = register.toggle().await;
    increment_health_toggles();
    tracing::info!("Health status toggled to: {status}");
    format!("Health status is now {status}\n")
}
