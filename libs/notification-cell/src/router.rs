use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers::{list_pending, mark_sent};

pub fn notification_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/pending", get(list_pending))
        .route("/{id}/sent", post(mark_sent))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
