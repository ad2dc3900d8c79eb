// libs/availability-cell/src/services/availability.rs
use chrono::{NaiveDate, NaiveTime};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::services::conflict::check_availability_conflict;
use shared_database::{AppointmentRepository, AvailabilityRepository, StorageError};
use shared_models::schedule::Weekday;
use shared_models::slot::{SlotError, SlotGrid, TimeSlot};
use shared_models::template::WeeklyTemplate;

use crate::models::{
    AppendSlotsRequest, AvailabilityConflict, AvailabilityError, StandardScheduleRequest,
};

/// Mutates a doctor's recurring weekly availability. Every added slot is
/// quantized and checked against dated appointments on the same weekday;
/// removals are deliberately permissive (a future appointment keeps its
/// date-specific slot even when the recurring offer disappears).
pub struct AvailabilityService {
    appointments: Arc<dyn AppointmentRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    grid: SlotGrid,
}

impl AvailabilityService {
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

    pub async fn get_template(
        &self,
        doctor_id: Uuid,
    ) -> Result<WeeklyTemplate, AvailabilityError> {
        Ok(self.availability.template(doctor_id).await?)
    }

    /// Union a batch of recurring slots into the weekly template.
    /// All-or-nothing: any invalid or conflicting slot rejects the whole
    /// request. Slots the template already offers merge silently.
    pub async fn append_slots(
        &self,
        doctor_id: Uuid,
        request: AppendSlotsRequest,
        today: NaiveDate,
    ) -> Result<WeeklyTemplate, AvailabilityError> {
        let template = self.availability.template(doctor_id).await?;

        // Quantize the full batch before touching anything.
        let mut validated: BTreeMap<Weekday, Vec<TimeSlot>> = BTreeMap::new();
        for (weekday, inputs) in request.slots {
            let mut day = Vec::new();
            for input in inputs {
                let slot = self.grid.quantize(input.start_time)?;
                if slot.end_time != input.end_time {
                    return Err(SlotError::InvalidDuration {
                        start: input.start_time,
                        end: input.end_time,
                    }
                    .into());
                }
                day.push(slot);
            }
            validated.insert(weekday, day);
        }

        // Only genuinely new slots need a conflict check; past appointments
        // on the weekday never block future availability.
        for (weekday, slots) in &validated {
            let appointments = self
                .appointments
                .for_doctor_weekday_from(doctor_id, *weekday, today)
                .await?;
            for slot in slots {
                if template.offers(*weekday, slot.start_time) {
                    continue;
                }
                if let Some(conflict) = check_availability_conflict(slot, &appointments) {
                    warn!(
                        "Rejecting availability batch for doctor {}: {} on {} taken by appointment {}",
                        doctor_id, slot.start_time, weekday, conflict.appointment_id
                    );
                    return Err(AvailabilityError::Conflict(AvailabilityConflict {
                        weekday: *weekday,
                        start_time: slot.start_time,
                        conflicting_appointment: conflict,
                    }));
                }
            }
        }

        let mut updated = template;
        for (weekday, slots) in validated {
            updated = self
                .availability
                .union_slots(doctor_id, weekday, slots)
                .await?;
        }

        info!("Availability template extended for doctor {}", doctor_id);
        Ok(updated)
    }

    /// Remove a recurring slot unconditionally. Succeeds even when a
    /// future-dated appointment depends on it; that appointment keeps its
    /// date-specific slot.
    pub async fn remove_slot(
        &self,
        doctor_id: Uuid,
        weekday: Weekday,
        start_time: NaiveTime,
    ) -> Result<WeeklyTemplate, AvailabilityError> {
        match self
            .availability
            .remove_slot(doctor_id, weekday, start_time)
            .await
        {
            Ok(template) => {
                debug!(
                    "Removed slot {} on {} for doctor {}",
                    start_time, weekday, doctor_id
                );
                Ok(template)
            }
            Err(StorageError::NotFound) => Err(AvailabilityError::SlotNotFound),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn mark_unavailable(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), AvailabilityError> {
        self.availability.mark_unavailable(doctor_id, date).await?;
        info!("Doctor {} marked unavailable on {}", doctor_id, date);
        Ok(())
    }

    pub async fn clear_unavailable(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), AvailabilityError> {
        match self.availability.clear_unavailable(doctor_id, date).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound) => Err(AvailabilityError::DateNotFound),
            Err(err) => Err(err.into()),
        }
    }

    /// Replace the weekly slot map with the full grid between the given
    /// working hours on the given days. Generated slots that the old
    /// template did not already offer are conflict-checked like appends;
    /// unavailable dates are untouched.
    pub async fn standard_schedule(
        &self,
        doctor_id: Uuid,
        request: StandardScheduleRequest,
        today: NaiveDate,
    ) -> Result<WeeklyTemplate, AvailabilityError> {
        let work_days: BTreeSet<Weekday> = request.work_days.into_iter().collect();
        if work_days.is_empty() {
            return Err(AvailabilityError::Validation(
                "work_days must not be empty".to_string(),
            ));
        }

        let slots = self
            .grid
            .enumerate(request.work_hours.start, request.work_hours.end);
        if slots.is_empty() {
            return Err(AvailabilityError::Validation(format!(
                "no bookable slots between {} and {}",
                request.work_hours.start, request.work_hours.end
            )));
        }

        let old = self.availability.template(doctor_id).await?;
        for weekday in &work_days {
            let appointments = self
                .appointments
                .for_doctor_weekday_from(doctor_id, *weekday, today)
                .await?;
            for slot in &slots {
                if old.offers(*weekday, slot.start_time) {
                    continue;
                }
                if let Some(conflict) = check_availability_conflict(slot, &appointments) {
                    return Err(AvailabilityError::Conflict(AvailabilityConflict {
                        weekday: *weekday,
                        start_time: slot.start_time,
                        conflicting_appointment: conflict,
                    }));
                }
            }
        }

        let replacement: BTreeMap<Weekday, Vec<TimeSlot>> = work_days
            .into_iter()
            .map(|weekday| (weekday, slots.clone()))
            .collect();
        let updated = self
            .availability
            .replace_slots(doctor_id, replacement)
            .await?;

        info!(
            "Standard schedule applied for doctor {} ({} slots/day over {} days)",
            doctor_id,
            slots.len(),
            updated.available_days().len()
        );
        Ok(updated)
    }
}
