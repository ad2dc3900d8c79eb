// libs/appointment-cell/src/services/conflict.rs
//
// Pure conflict decisions. No storage access: callers supply the relevant
// appointment set, which keeps both checks deterministic and unit-testable
// with literal fixtures.
use chrono::{NaiveDate, NaiveTime};

use shared_models::appointment::Appointment;
use shared_models::slot::TimeSlot;

use crate::models::SlotConflict;

/// Would offering `proposed` as recurring weekly availability collide with a
/// dated appointment? `appointments` must already be filtered to the target
/// doctor and weekday (and to dates that can still matter).
pub fn check_availability_conflict(
    proposed: &TimeSlot,
    appointments: &[Appointment],
) -> Option<SlotConflict> {
    appointments
        .iter()
        .find(|appointment| appointment.hour == proposed.start_time)
        .map(conflict_from)
}

/// Does a non-cancelled appointment already occupy exactly
/// `(date, hour)` in the supplied set?
pub fn check_booking_conflict(
    date: NaiveDate,
    hour: NaiveTime,
    existing: &[Appointment],
) -> Option<SlotConflict> {
    existing
        .iter()
        .find(|appointment| appointment.date == date && appointment.hour == hour)
        .map(conflict_from)
}

fn conflict_from(appointment: &Appointment) -> SlotConflict {
    SlotConflict {
        appointment_id: appointment.id,
        patient_id: appointment.patient_id,
        date: appointment.date,
        hour: appointment.hour,
    }
}
