use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use auth_cell::router::{auth_routes, client_routes};
use notification_cell::router::notification_routes;
use shared_utils::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(appointment_routes(state.clone()))
        .merge(notification_routes(state.clone()))
        .merge(client_routes(state.clone()));

    Router::new()
        .route("/", get(|| async { "AgendaPro API is running!" }))
        .nest("/auth", auth_routes(state))
        .nest("/api", api)
}
