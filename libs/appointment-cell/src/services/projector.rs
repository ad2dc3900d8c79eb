// libs/appointment-cell/src/services/projector.rs
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_database::{AppointmentRepository, AvailabilityRepository};
use shared_models::appointment::Appointment;
use shared_models::schedule::day_of_week;
use shared_models::slot::{SlotGrid, TimeSlot};

use crate::models::{BookingError, DaySchedule, ScheduleCell, SlotStatus, TemporalState};
use crate::services::store::AppointmentStoreService;

// Guard against accidental unbounded range queries from the dashboard.
const MAX_PROJECTION_DAYS: i64 = 92;

/// Read-only view builder merging the weekly template and the appointment
/// store into a per-day grid of slot statuses. Never mutates; safe to call
/// concurrently with bookings (results may trail in-flight writes).
pub struct ScheduleProjector {
    appointments: Arc<dyn AppointmentRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    grid: SlotGrid,
}

impl ScheduleProjector {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        availability: Arc<dyn AvailabilityRepository>,
        grid: SlotGrid,
    ) -> Self {
        Self {
            appointments,
            availability,
            grid,
        }
    }

    pub async fn project(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<DaySchedule>, BookingError> {
        if to < from {
            return Err(BookingError::Validation(
                "range end precedes range start".to_string(),
            ));
        }
        if (to - from).num_days() >= MAX_PROJECTION_DAYS {
            return Err(BookingError::Validation(format!(
                "schedule range is limited to {MAX_PROJECTION_DAYS} days"
            )));
        }

        let template = self.availability.template(doctor_id).await?;
        let canonical = self.grid.all_slots();

        let mut days = Vec::new();
        let mut date = from;
        while date <= to {
            let weekday = day_of_week(date);
            let closed = template.is_closed_on(date);
            let booked: HashMap<NaiveTime, Appointment> = self
                .appointments
                .for_doctor_on(doctor_id, date)
                .await?
                .into_iter()
                .map(|appointment| (appointment.hour, appointment))
                .collect();

            let cells = canonical
                .iter()
                .map(|slot| self.cell_for(slot, &booked, closed, || {
                    template.offers(weekday, slot.start_time)
                }, now))
                .collect();

            days.push(DaySchedule {
                date,
                weekday,
                cells,
            });

            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        debug!(
            "Projected {} days for doctor {} ({} slots/day)",
            days.len(),
            doctor_id,
            canonical.len()
        );
        Ok(days)
    }

    /// The slots of one day a patient could still book: the Available cells
    /// of the projected grid.
    pub async fn open_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<TimeSlot>, BookingError> {
        let days = self.project(doctor_id, date, date, now).await?;
        Ok(days
            .into_iter()
            .flat_map(|day| day.cells)
            .filter(|cell| cell.status == SlotStatus::Available)
            .map(|cell| cell.slot)
            .collect())
    }

    fn cell_for(
        &self,
        slot: &TimeSlot,
        booked: &HashMap<NaiveTime, Appointment>,
        closed: bool,
        offered: impl FnOnce() -> bool,
        now: NaiveDateTime,
    ) -> ScheduleCell {
        if let Some(appointment) = booked.get(&slot.start_time) {
            let status = match AppointmentStoreService::classify(appointment, now) {
                TemporalState::Past => SlotStatus::BookedPast,
                _ => SlotStatus::BookedUpcoming,
            };
            return ScheduleCell {
                slot: *slot,
                status,
                appointment_id: Some(appointment.id),
            };
        }

        let status = if !closed && offered() {
            SlotStatus::Available
        } else {
            SlotStatus::Unavailable
        };
        ScheduleCell {
            slot: *slot,
            status,
            appointment_id: None,
        }
    }
}
