pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use crate::http::server::AppState;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// Path of the add-backend endpoint.
pub const ADD_BACKEND_PATH: &str = "/add";

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(ADD_BACKEND_PATH, post(add_backend))
        .route("/admin/backends", get(get_backends))
        .route("/admin/status", get(get_status))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
