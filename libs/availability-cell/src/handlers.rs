// libs/availability-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Local, NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use shared_database::EngineState;
use shared_models::error::AppError;
use shared_models::schedule::Weekday;
use shared_models::slot::wire_time;

use crate::models::{
    AppendSlotsRequest, AvailabilityError, MarkUnavailableRequest, StandardScheduleRequest,
};
use crate::services::availability::AvailabilityService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct RemoveSlotQuery {
    pub weekday: Weekday,
    #[serde(with = "wire_time")]
    pub start_time: NaiveTime,
}

// ==============================================================================
// SERVICE WIRING
// ==============================================================================

fn availability_service(state: &EngineState) -> AvailabilityService {
    AvailabilityService::new(state.appointments(), state.availability(), state.slot_grid())
}

fn clinic_today() -> NaiveDate {
    Local::now().date_naive()
}

fn map_availability_error(err: AvailabilityError) -> AppError {
    match err {
        AvailabilityError::InvalidSlot(e) => AppError::ValidationError(e.to_string()),
        AvailabilityError::Validation(msg) => AppError::ValidationError(msg),
        AvailabilityError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        AvailabilityError::DateNotFound => {
            AppError::NotFound("Unavailable date not found".to_string())
        }
        AvailabilityError::Conflict(_) => {
            // Structured 409s are built at the handler; this arm only backs
            // paths that do not special-case the conflict payload.
            AppError::Conflict("availability conflict".to_string())
        }
        AvailabilityError::Storage(msg) => AppError::StorageUnavailable(msg),
    }
}

/// 409 carrying the full conflict detail: which weekday/slot clashed and the
/// appointment (with patient context) that owns it.
fn conflict_response(err: AvailabilityError) -> Response {
    match err {
        AvailabilityError::Conflict(conflict) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "AVAILABILITY_CONFLICT",
                "conflict": conflict
            })),
        )
            .into_response(),
        other => map_availability_error(other).into_response(),
    }
}

// ==============================================================================
// TEMPLATE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let template = availability_service(&state)
        .get_template(doctor_id)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "available_days": template.available_days(),
        "available_time_slots": template.slots,
        "unavailable_dates": template.unavailable_dates
    })))
}

#[axum::debug_handler]
pub async fn append_slots(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<AppendSlotsRequest>,
) -> Response {
    match availability_service(&state)
        .append_slots(doctor_id, request, clinic_today())
        .await
    {
        Ok(template) => Json(json!({
            "success": true,
            "available_days": template.available_days(),
            "available_time_slots": template.slots
        }))
        .into_response(),
        Err(err) => conflict_response(err),
    }
}

#[axum::debug_handler]
pub async fn remove_slot(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<RemoveSlotQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let template = availability_service(&state)
        .remove_slot(doctor_id, query.weekday, query.start_time)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "available_days": template.available_days(),
        "available_time_slots": template.slots
    })))
}

#[axum::debug_handler]
pub async fn set_standard_schedule(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<StandardScheduleRequest>,
) -> Response {
    match availability_service(&state)
        .standard_schedule(doctor_id, request, clinic_today())
        .await
    {
        Ok(template) => Json(json!({
            "success": true,
            "available_days": template.available_days(),
            "available_time_slots": template.slots
        }))
        .into_response(),
        Err(err) => conflict_response(err),
    }
}

// ==============================================================================
// UNAVAILABLE-DATE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn mark_unavailable(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<MarkUnavailableRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    availability_service(&state)
        .mark_unavailable(doctor_id, request.date)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "date": request.date
    })))
}

#[axum::debug_handler]
pub async fn clear_unavailable(
    State(state): State<Arc<EngineState>>,
    Path((doctor_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<serde_json::Value>, AppError> {
    availability_service(&state)
        .clear_unavailable(doctor_id, date)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({
        "success": true,
        "date": date
    })))
}
