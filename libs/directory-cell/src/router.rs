use std::sync::Arc;

use axum::{routing::get, Router};

use shared_utils::state::AppState;

use crate::handlers::{list_doctors, list_rooms, list_visit_types};

/// Public, read-only catalog: no credential required.
pub fn directory_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/doctors", get(list_doctors))
        .route("/rooms", get(list_rooms))
        .route("/visit-types", get(list_visit_types))
        .with_state(state)
}
