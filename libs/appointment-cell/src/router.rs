use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers::{
    cancel_appointment, create_appointment, day_agenda, get_appointment, public_booking,
};

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/", post(create_appointment))
        .route("/{id}", get(get_appointment))
        .route("/{id}", delete(cancel_appointment))
        .route("/agenda", get(day_agenda))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/public", post(public_booking))
        .merge(protected)
        .with_state(state)
}
