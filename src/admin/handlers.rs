use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::UNIX_EPOCH;
use crate::http::server::AppState;
use crate::load_balancer::Backend;
use crate::observability::metrics;

/// Body of `POST /add`.
#[derive(Debug, Deserialize)]
pub struct AddBackendRequest {
    #[serde(alias = "path")]
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisteredBackend {
    pub id: usize,
    pub address: String,
    /// Registry size after this registration.
    pub backends: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendStatus {
    pub id: usize,
    pub address: String,
    pub registered_at_unix_secs: u64,
}

impl From<&Backend> for BackendStatus {
    fn from(backend: &Backend) -> Self {
        Self {
            id: backend.id().as_usize(),
            address: backend.url().to_string(),
            registered_at_unix_secs: backend
                .registered_at()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub backends: usize,
}

pub async fn add_backend(State(state): State<AppState>, body: Bytes) -> Response {
    let request: AddBackendRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "Undecodable add-backend body");
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    match state.registry.register(&request.address) {
        Ok(backend) => {
            let total = state.registry.len();
            metrics::record_backend_count(total);
            let body = RegisteredBackend {
                id: backend.id().as_usize(),
                address: backend.url().to_string(),
                backends: total,
            };
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(e) => {
            tracing::warn!(address = %request.address, error = %e, "Backend registration rejected");
            e.into_response()
        }
    }
}

pub async fn get_backends(State(state): State<AppState>) -> Json<Vec<BackendStatus>> {
    let backends = state.registry.snapshot();
    Json(backends.iter().map(|b| BackendStatus::from(b.as_ref())).collect())
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        backends: state.registry.len(),
    })
}
