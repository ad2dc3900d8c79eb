// libs/availability-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use shared_database::EngineState;

use crate::handlers;

pub fn availability_routes(state: Arc<EngineState>) -> Router {
    Router::new()
        .route("/{doctor_id}", get(handlers::get_availability))
        .route("/{doctor_id}/append", post(handlers::append_slots))
        .route("/{doctor_id}/slot", delete(handlers::remove_slot))
        .route(
            "/{doctor_id}/standard-schedule",
            post(handlers::set_standard_schedule),
        )
        .route(
            "/{doctor_id}/unavailable-dates",
            post(handlers::mark_unavailable),
        )
        .route(
            "/{doctor_id}/unavailable-dates/{date}",
            delete(handlers::clear_unavailable),
        )
        .with_state(state)
}
