// libs/appointment-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_directory::store::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: AppState) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/createSlots", post(handlers::create_slots))
        .route("/", get(handlers::list_slots))
        .route("/book/{appointment_id}", patch(handlers::book_slot))
        .route("/reschedule/{appointment_id}", patch(handlers::reschedule_slot))
        .route("/cancel/{appointment_id}", patch(handlers::cancel_slot))
        .route(
            "/{appointment_id}",
            get(handlers::get_slot).delete(handlers::delete_slot),
        )
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}
