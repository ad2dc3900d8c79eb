// libs/appointment-cell/src/services/store.rs
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_database::AppointmentRepository;
use shared_models::appointment::Appointment;

use crate::models::{
    AppointmentSearchQuery, BookingError, ClinicalUpdateRequest, PatientScheduleFilter,
    TemporalState,
};

/// Read-side of the appointment store: temporal classification and the
/// filtered dashboard views. All mutation goes through BookingService.
pub struct AppointmentStoreService {
    repository: Arc<dyn AppointmentRepository>,
}

impl AppointmentStoreService {
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository }
    }

    /// Where an appointment sits relative to `now`. An appointment is
    /// Ongoing from its start up to (exclusive) the end of its 30-minute
    /// slot, and Past from the end boundary onward.
    pub fn classify(appointment: &Appointment, now: NaiveDateTime) -> TemporalState {
        let start = appointment.scheduled_start();
        let end = appointment.scheduled_end();

        if now >= end {
            TemporalState::Past
        } else if now >= start {
            TemporalState::Ongoing
        } else if appointment.date == now.date() {
            TemporalState::TodayUpcoming
        } else {
            TemporalState::Future
        }
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        Ok(self.repository.get(appointment_id).await?)
    }

    /// Appointments happening right now, ordered by hour.
    pub async fn ongoing(
        &self,
        doctor_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<Vec<Appointment>, BookingError> {
        let mut ongoing: Vec<Appointment> = self
            .repository
            .for_doctor_on(doctor_id, now.date())
            .await?
            .into_iter()
            .filter(|appointment| Self::classify(appointment, now) == TemporalState::Ongoing)
            .collect();
        ongoing.sort_by_key(Appointment::slot_key);
        Ok(ongoing)
    }

    /// Everything scheduled today regardless of state, ordered by hour.
    pub async fn today(
        &self,
        doctor_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<Vec<Appointment>, BookingError> {
        let mut todays = self.repository.for_doctor_on(doctor_id, now.date()).await?;
        todays.sort_by_key(Appointment::slot_key);
        Ok(todays)
    }

    /// Not-yet-started appointments (later today or any future date),
    /// `(date, hour)` ascending.
    pub async fn upcoming(
        &self,
        doctor_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<Vec<Appointment>, BookingError> {
        let mut upcoming: Vec<Appointment> = self
            .repository
            .for_doctor(doctor_id)
            .await?
            .into_iter()
            .filter(|appointment| {
                matches!(
                    Self::classify(appointment, now),
                    TemporalState::TodayUpcoming | TemporalState::Future
                )
            })
            .collect();
        upcoming.sort_by_key(Appointment::slot_key);
        Ok(upcoming)
    }

    /// Finished appointments, most recent first.
    pub async fn past(
        &self,
        doctor_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<Vec<Appointment>, BookingError> {
        let mut past: Vec<Appointment> = self
            .repository
            .for_doctor(doctor_id)
            .await?
            .into_iter()
            .filter(|appointment| Self::classify(appointment, now) == TemporalState::Past)
            .collect();
        past.sort_by_key(Appointment::slot_key);
        past.reverse();
        Ok(past)
    }

    pub async fn for_patient(
        &self,
        patient_id: Uuid,
        filter: Option<PatientScheduleFilter>,
        now: NaiveDateTime,
    ) -> Result<Vec<Appointment>, BookingError> {
        let mut appointments = self.repository.for_patient(patient_id).await?;
        if let Some(filter) = filter {
            appointments.retain(|appointment| {
                let state = Self::classify(appointment, now);
                match filter {
                    PatientScheduleFilter::Past => state == TemporalState::Past,
                    PatientScheduleFilter::Upcoming => state != TemporalState::Past,
                }
            });
        }
        if filter == Some(PatientScheduleFilter::Past) {
            appointments.reverse();
        }
        Ok(appointments)
    }

    /// Flag- and range-filtered search scoped to a doctor or a patient.
    pub async fn search(
        &self,
        query: AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, BookingError> {
        let mut results = match (query.doctor_id, query.patient_id) {
            (Some(doctor_id), _) => self.repository.for_doctor(doctor_id).await?,
            (None, Some(patient_id)) => self.repository.for_patient(patient_id).await?,
            (None, None) => {
                return Err(BookingError::Validation(
                    "search requires doctor_id or patient_id".to_string(),
                ))
            }
        };

        if let Some(patient_id) = query.patient_id {
            results.retain(|appointment| appointment.patient_id == patient_id);
        }
        if let Some(from) = query.from_date {
            results.retain(|appointment| appointment.date >= from);
        }
        if let Some(to) = query.to_date {
            results.retain(|appointment| appointment.date <= to);
        }
        if let Some(is_vaccine) = query.is_vaccine {
            results.retain(|appointment| appointment.flags.is_vaccine == is_vaccine);
        }
        if let Some(report_pending) = query.report_pending {
            results.retain(|appointment| appointment.flags.report_pending == report_pending);
        }

        results.sort_by_key(Appointment::slot_key);
        debug!("Appointment search returned {} records", results.len());
        Ok(results)
    }

    /// Merge clinical documentation into an existing record. The slot key is
    /// immutable here; rescheduling is a separate cancel+recreate path.
    pub async fn annotate(
        &self,
        appointment_id: Uuid,
        update: ClinicalUpdateRequest,
    ) -> Result<Appointment, BookingError> {
        let updated = self
            .repository
            .update_clinical(appointment_id, update.clinical, update.flags)
            .await?;
        debug!("Appointment {} annotated", appointment_id);
        Ok(updated)
    }
}
