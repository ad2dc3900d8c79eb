// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::EngineState;
use shared_models::error::AppError;

use crate::models::{
    AppointmentSearchQuery, BookAppointmentRequest, BookingError, ClinicalUpdateRequest,
    PatientScheduleFilter, RescheduleAppointmentRequest,
};
use crate::services::booking::BookingService;
use crate::services::projector::ScheduleProjector;
use crate::services::store::AppointmentStoreService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct PatientScheduleQuery {
    pub when: Option<PatientScheduleFilter>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct OpenSlotsQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// SERVICE WIRING
// ==============================================================================

fn booking_service(state: &EngineState) -> BookingService {
    BookingService::new(state.appointments(), state.availability(), state.slot_grid())
}

fn store_service(state: &EngineState) -> AppointmentStoreService {
    AppointmentStoreService::new(state.appointments())
}

fn projector(state: &EngineState) -> ScheduleProjector {
    ScheduleProjector::new(state.appointments(), state.availability(), state.slot_grid())
}

fn clinic_now() -> NaiveDateTime {
    // All engine times are clinic-local wall clock.
    Local::now().naive_local()
}

fn map_booking_error(err: BookingError) -> AppError {
    match err {
        // Display of SlotUnavailable is the TIME_SLOT_UNAVAILABLE sentinel,
        // preserved verbatim for existing callers.
        BookingError::SlotUnavailable => AppError::Conflict(err.to_string()),
        BookingError::InvalidSlot(e) => AppError::ValidationError(e.to_string()),
        BookingError::Validation(msg) => AppError::ValidationError(msg),
        BookingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        BookingError::Storage(msg) => AppError::StorageUnavailable(msg),
    }
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<EngineState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = booking_service(&state)
        .book(request)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<EngineState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let cancelled = booking_service(&state)
        .cancel(appointment_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "cancelled": cancelled
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<EngineState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = booking_service(&state)
        .reschedule(appointment_id, request)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn update_clinical(
    State(state): State<Arc<EngineState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<ClinicalUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = store_service(&state)
        .annotate(appointment_id, request)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<EngineState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = store_service(&state)
        .get(appointment_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<EngineState>>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = store_service(&state)
        .search(query)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointments)))
}

// ==============================================================================
// SCHEDULE LISTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<EngineState>>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<PatientScheduleQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = store_service(&state)
        .for_patient(patient_id, query.when, clinic_now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_ongoing_appointments(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointments = store_service(&state)
        .ongoing(doctor_id, clinic_now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_today_appointments(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointments = store_service(&state)
        .today(doctor_id, clinic_now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_upcoming_appointments(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointments = store_service(&state)
        .upcoming(doctor_id, clinic_now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_past_appointments(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointments = store_service(&state)
        .past(doctor_id, clinic_now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointments)))
}

// ==============================================================================
// PROJECTION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctor_schedule(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
    Query(range): Query<ScheduleRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let days = projector(&state)
        .project(doctor_id, range.from, range.to, clinic_now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "days": days
    })))
}

#[axum::debug_handler]
pub async fn get_open_slots(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<OpenSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = projector(&state)
        .open_slots(doctor_id, query.date, clinic_now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "available_slots": slots
    })))
}
