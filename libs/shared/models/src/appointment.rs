// libs/shared/models/src/appointment.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::slot::{wire_time, SLOT_MINUTES};

/// A concrete, dated appointment occupying one slot of a doctor's day.
/// The engine owns the slot key `(doctor_id, date, hour)`; patient and
/// doctor identities are external references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "wire_time")]
    pub hour: NaiveTime,
    pub reason: String,
    pub location: Option<String>,
    #[serde(default)]
    pub clinical: ClinicalNotes,
    #[serde(default)]
    pub flags: AppointmentFlags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn slot_key(&self) -> (NaiveDate, NaiveTime) {
        (self.date, self.hour)
    }

    pub fn scheduled_start(&self) -> NaiveDateTime {
        self.date.and_time(self.hour)
    }

    /// End of the occupied slot; duration is the canonical 30 minutes.
    pub fn scheduled_end(&self) -> NaiveDateTime {
        self.scheduled_start() + Duration::minutes(SLOT_MINUTES)
    }
}

/// Post-visit documentation written by clinical collaborators. Opaque to the
/// scheduling engine: stored, merged, never interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalNotes {
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub plan: Option<String>,
    pub personal_notes: Option<String>,
}

impl ClinicalNotes {
    /// Field-wise merge; `None` fields in `update` leave existing values.
    pub fn merge(&mut self, update: ClinicalNotes) {
        if update.diagnosis.is_some() {
            self.diagnosis = update.diagnosis;
        }
        if update.prescription.is_some() {
            self.prescription = update.prescription;
        }
        if update.plan.is_some() {
            self.plan = update.plan;
        }
        if update.personal_notes.is_some() {
            self.personal_notes = update.personal_notes;
        }
    }
}

/// Boolean markers with no engine-level behavior beyond storage and
/// filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentFlags {
    #[serde(default)]
    pub is_vaccine: bool,
    #[serde(default)]
    pub report_pending: bool,
}
