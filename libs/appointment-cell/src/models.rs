// libs/appointment-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::StorageError;
use shared_models::appointment::{AppointmentFlags, ClinicalNotes};
use shared_models::schedule::Weekday;
use shared_models::slot::{wire_time, SlotError, TimeSlot};

/// Wire sentinel for "this slot cannot be booked", whether the doctor never
/// offered it or someone else got there first. Existing callers match on the
/// literal string, so it must not change.
pub const TIME_SLOT_UNAVAILABLE: &str = "TIME_SLOT_UNAVAILABLE";

// ==============================================================================
// TEMPORAL CLASSIFICATION
// ==============================================================================

/// Derived (never stored) position of an appointment relative to the
/// evaluation instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalState {
    Past,
    Ongoing,
    TodayUpcoming,
    Future,
}

/// Patient-facing list filter mirroring the dashboard tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientScheduleFilter {
    Upcoming,
    Past,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "wire_time")]
    pub hour: NaiveTime,
    pub reason: String,
    pub location: Option<String>,
    #[serde(default)]
    pub flags: AppointmentFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub date: NaiveDate,
    #[serde(with = "wire_time")]
    pub hour: NaiveTime,
}

/// Post-visit annotation written by clinical collaborators; merged into the
/// stored record without touching the slot key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalUpdateRequest {
    #[serde(default)]
    pub clinical: ClinicalNotes,
    pub flags: Option<AppointmentFlags>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentSearchQuery {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub is_vaccine: Option<bool>,
    pub report_pending: Option<bool>,
}

// ==============================================================================
// CONFLICT DETECTION MODELS
// ==============================================================================

/// The appointment that makes a proposed slot or booking unsafe, with enough
/// context for the caller to resolve it manually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConflict {
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "wire_time")]
    pub hour: NaiveTime,
}

// ==============================================================================
// SCHEDULE PROJECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    BookedPast,
    BookedUpcoming,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCell {
    pub slot: TimeSlot,
    pub status: SlotStatus,
    pub appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub cells: Vec<ScheduleCell>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("invalid time slot: {0}")]
    InvalidSlot(#[from] SlotError),

    // Display is the wire sentinel; see TIME_SLOT_UNAVAILABLE.
    #[error("TIME_SLOT_UNAVAILABLE")]
    SlotUnavailable,

    #[error("appointment not found")]
    NotFound,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl From<StorageError> for BookingError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateSlot => BookingError::SlotUnavailable,
            StorageError::NotFound => BookingError::NotFound,
            StorageError::Unavailable(reason) => BookingError::Storage(reason),
        }
    }
}
