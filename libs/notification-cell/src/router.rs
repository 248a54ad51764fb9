use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn notification_routes(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/{notification_id}/read", post(handlers::mark_notification_read))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
