// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use shared_database::EngineState;

use crate::handlers;

pub fn appointment_routes(state: Arc<EngineState>) -> Router {
    Router::new()
        // Booking lifecycle
        .route("/", post(handlers::book_appointment))
        .route("/search", get(handlers::search_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", delete(handlers::cancel_appointment))
        .route(
            "/{appointment_id}/reschedule",
            post(handlers::reschedule_appointment),
        )
        .route("/{appointment_id}/clinical", patch(handlers::update_clinical))
        // Classified listings
        .route(
            "/patients/{patient_id}",
            get(handlers::get_patient_appointments),
        )
        .route(
            "/doctors/{doctor_id}/ongoing",
            get(handlers::get_ongoing_appointments),
        )
        .route(
            "/doctors/{doctor_id}/today",
            get(handlers::get_today_appointments),
        )
        .route(
            "/doctors/{doctor_id}/upcoming",
            get(handlers::get_upcoming_appointments),
        )
        .route(
            "/doctors/{doctor_id}/past",
            get(handlers::get_past_appointments),
        )
        // Grid projections
        .route(
            "/doctors/{doctor_id}/schedule",
            get(handlers::get_doctor_schedule),
        )
        .route("/doctors/{doctor_id}/slots", get(handlers::get_open_slots))
        .with_state(state)
}
