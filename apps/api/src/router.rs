use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use shared_directory::store::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Carebook API is running!" }))
        .nest("/appointments", appointment_routes(state))
}
