// libs/appointment-cell/src/services/booking.rs
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{AppointmentRepository, AvailabilityRepository, StorageError};
use shared_models::appointment::{Appointment, ClinicalNotes};
use shared_models::schedule::day_of_week;
use shared_models::slot::SlotGrid;

use crate::models::{BookAppointmentRequest, BookingError, RescheduleAppointmentRequest};

/// Transactional entry point for creating, cancelling and rescheduling
/// appointments. A booking attempt runs Requested -> Validating ->
/// {Committed | Rejected}; the commit itself rides on the store's atomic
/// check-and-insert, so two racing requests for one slot cannot both win.
pub struct BookingService {
    appointments: Arc<dyn AppointmentRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    grid: SlotGrid,
    max_storage_retries: u32,
    retry_base_delay: Duration,
}

impl BookingService {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        availability: Arc<dyn AvailabilityRepository>,
        grid: SlotGrid,
    ) -> Self {
        Self {
            appointments,
            availability,
            grid,
            max_storage_retries: 3,
            retry_base_delay: Duration::from_millis(50),
        }
    }

    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_storage_retries = max_retries;
        self.retry_base_delay = base_delay;
        self
    }

    pub async fn book(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        debug!(
            "Booking request for doctor {} on {} at {}",
            request.doctor_id, request.date, request.hour
        );

        // Step 1: quantize onto the half-hour grid.
        let slot = self.grid.quantize(request.hour)?;
        if request.reason.trim().is_empty() {
            return Err(BookingError::Validation("reason is required".to_string()));
        }

        // Step 2: the slot must be offered on that weekday and the date must
        // not be overridden to closed. Both failures surface as the same
        // sentinel; callers are not told whether the slot was never offered
        // or is booked out.
        let weekday = day_of_week(request.date);
        let template = self
            .with_retry("load availability template", || {
                self.availability.template(request.doctor_id)
            })
            .await?;

        if template.is_closed_on(request.date) {
            debug!(
                "Doctor {} is unavailable on {}",
                request.doctor_id, request.date
            );
            return Err(BookingError::SlotUnavailable);
        }
        if !template.offers(weekday, slot.start_time) {
            debug!(
                "Doctor {} does not offer {} on {}",
                request.doctor_id, slot.start_time, weekday
            );
            return Err(BookingError::SlotUnavailable);
        }

        // Step 3: atomic check-and-insert. A DuplicateSlot here means a
        // concurrent booking won the slot; that is the same terminal outcome
        // as an unoffered slot and is never retried.
        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            patient_id: request.patient_id,
            date: request.date,
            hour: slot.start_time,
            reason: request.reason,
            location: request.location,
            clinical: ClinicalNotes::default(),
            flags: request.flags,
            created_at: now,
            updated_at: now,
        };

        let committed = self
            .with_retry("insert appointment", || {
                self.appointments.insert(appointment.clone())
            })
            .await
            .map_err(BookingError::from)?;

        info!(
            "Appointment {} committed for doctor {} on {} at {}",
            committed.id, committed.doctor_id, committed.date, committed.hour
        );
        Ok(committed)
    }

    /// Cancel frees the slot for that specific date only; the weekly
    /// template is untouched. Cancelling an absent record reports NotFound
    /// and is not retried.
    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        let cancelled = self
            .with_retry("remove appointment", || {
                self.appointments.remove(appointment_id)
            })
            .await
            .map_err(BookingError::from)?;
        info!(
            "Appointment {} cancelled, slot {} {} freed",
            cancelled.id, cancelled.date, cancelled.hour
        );
        Ok(cancelled)
    }

    /// Reschedule is cancel+recreate: the new slot is committed first so a
    /// failed attempt leaves the original untouched, then the old record is
    /// removed. Clinical documentation carries over to the new record.
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let existing = self.appointments.get(appointment_id).await?;

        let replacement = self
            .book(BookAppointmentRequest {
                doctor_id: existing.doctor_id,
                patient_id: existing.patient_id,
                date: request.date,
                hour: request.hour,
                reason: existing.reason.clone(),
                location: existing.location.clone(),
                flags: existing.flags,
            })
            .await?;

        let replacement = self
            .appointments
            .update_clinical(replacement.id, existing.clinical.clone(), None)
            .await?;

        match self.appointments.remove(appointment_id).await {
            Ok(_) => {
                info!(
                    "Appointment {} rescheduled to {} at {} as {}",
                    appointment_id, replacement.date, replacement.hour, replacement.id
                );
                Ok(replacement)
            }
            Err(err) => {
                // The original vanished (or storage failed) after the new
                // slot was taken; give the new slot back before reporting.
                warn!(
                    "Reschedule of {} could not remove original ({}), compensating",
                    appointment_id, err
                );
                if let Err(cleanup) = self.appointments.remove(replacement.id).await {
                    warn!(
                        "Compensation failed, appointment {} may be orphaned: {}",
                        replacement.id, cleanup
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Retry wrapper for storage operations. Only infrastructure failures
    /// (StorageError::Unavailable) are retried; business-rule failures are
    /// terminal because the condition will not resolve itself.
    async fn with_retry<T, F, Fut>(&self, action: &str, mut operation: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Err(StorageError::Unavailable(reason)) if attempt < self.max_storage_retries => {
                    attempt += 1;
                    let delay = self.retry_base_delay * 2u32.pow(attempt - 1);
                    warn!(
                        "{} unavailable ({}), retry {}/{} in {:?}",
                        action, reason, attempt, self.max_storage_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                outcome => return outcome,
            }
        }
    }
}
