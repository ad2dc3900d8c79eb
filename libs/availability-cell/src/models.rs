// libs/availability-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use appointment_cell::models::SlotConflict;
use shared_database::StorageError;
use shared_models::schedule::Weekday;
use shared_models::slot::{wire_time, SlotError};

/// Raw slot bounds as supplied by the caller; validated against the grid
/// before anything is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotInput {
    #[serde(with = "wire_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wire_time")]
    pub end_time: NaiveTime,
}

/// Batch of recurring slots to union into the weekly template,
/// all-or-nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendSlotsRequest {
    pub slots: BTreeMap<Weekday, Vec<SlotInput>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkHours {
    #[serde(with = "wire_time")]
    pub start: NaiveTime,
    #[serde(with = "wire_time")]
    pub end: NaiveTime,
}

/// Regenerate the whole weekly grid from a working-hours window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScheduleRequest {
    pub work_days: Vec<Weekday>,
    pub work_hours: WorkHours,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkUnavailableRequest {
    pub date: NaiveDate,
}

/// Why a proposed recurring slot was rejected: the dated appointment that
/// already occupies it, with patient-identifying context so the doctor can
/// resolve the clash manually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityConflict {
    pub weekday: Weekday,
    #[serde(with = "wire_time")]
    pub start_time: NaiveTime,
    pub conflicting_appointment: SlotConflict,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AvailabilityError {
    #[error("invalid time slot: {0}")]
    InvalidSlot(#[from] SlotError),

    #[error("proposed slot conflicts with an existing appointment")]
    Conflict(AvailabilityConflict),

    #[error("slot not found")]
    SlotNotFound,

    #[error("unavailable date not found")]
    DateNotFound,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl From<StorageError> for AvailabilityError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => AvailabilityError::SlotNotFound,
            StorageError::Unavailable(reason) => AvailabilityError::Storage(reason),
            // The template store never reports slot occupancy.
            StorageError::DuplicateSlot => {
                AvailabilityError::Validation("unexpected duplicate-slot report".to_string())
            }
        }
    }
}
