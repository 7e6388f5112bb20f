//! HTTP handlers.

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::application::{SessionHandle, SessionStatus};

#[derive(Clone)]
pub struct HealthState {
    pub session: SessionHandle,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub session: SessionStatus,
}

/// `GET /health`
pub async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        session: state.session.status().await,
    })
}
