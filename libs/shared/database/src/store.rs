// libs/shared/database/src/store.rs
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use shared_models::appointment::{Appointment, AppointmentFlags, ClinicalNotes};
use shared_models::schedule::{day_of_week, Weekday};
use shared_models::slot::TimeSlot;
use shared_models::template::WeeklyTemplate;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("an active appointment already occupies this slot")]
    DuplicateSlot,

    #[error("record not found")]
    NotFound,

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable keyed storage for appointments. The check-and-insert on
/// `(doctor_id, date, hour)` must be linearizable per doctor.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StorageError>;
    async fn remove(&self, id: Uuid) -> Result<Appointment, StorageError>;
    async fn get(&self, id: Uuid) -> Result<Appointment, StorageError>;
    async fn update_clinical(
        &self,
        id: Uuid,
        clinical: ClinicalNotes,
        flags: Option<AppointmentFlags>,
    ) -> Result<Appointment, StorageError>;
    async fn for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StorageError>;
    async fn for_doctor_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, StorageError>;
    /// Appointments of a doctor whose date falls on `weekday` and is not
    /// before `from`. Past appointments never block availability edits.
    async fn for_doctor_weekday_from(
        &self,
        doctor_id: Uuid,
        weekday: Weekday,
        from: NaiveDate,
    ) -> Result<Vec<Appointment>, StorageError>;
    async fn for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StorageError>;
}

/// Persistence for a doctor's recurring weekly template and unavailable
/// dates. Writes are visible to subsequent reads immediately.
#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    async fn template(&self, doctor_id: Uuid) -> Result<WeeklyTemplate, StorageError>;
    async fn union_slots(
        &self,
        doctor_id: Uuid,
        weekday: Weekday,
        slots: Vec<TimeSlot>,
    ) -> Result<WeeklyTemplate, StorageError>;
    async fn remove_slot(
        &self,
        doctor_id: Uuid,
        weekday: Weekday,
        start_time: NaiveTime,
    ) -> Result<WeeklyTemplate, StorageError>;
    async fn replace_slots(
        &self,
        doctor_id: Uuid,
        slots: BTreeMap<Weekday, Vec<TimeSlot>>,
    ) -> Result<WeeklyTemplate, StorageError>;
    async fn mark_unavailable(&self, doctor_id: Uuid, date: NaiveDate)
        -> Result<(), StorageError>;
    async fn clear_unavailable(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), StorageError>;
}

#[derive(Default)]
struct DoctorShard {
    template: WeeklyTemplate,
    appointments: BTreeMap<(NaiveDate, NaiveTime), Appointment>,
    by_id: HashMap<Uuid, (NaiveDate, NaiveTime)>,
}

/// In-memory schedule storage sharded by doctor. Each shard is guarded by
/// its own async mutex, so every slot-touching operation for one doctor is
/// serialized while different doctors proceed fully in parallel.
///
/// Lock order: a shard mutex may be held while touching the directory, but
/// the directory guard is always dropped before a shard lock is taken.
pub struct ScheduleStore {
    shards: RwLock<HashMap<Uuid, Arc<Mutex<DoctorShard>>>>,
    // appointment id -> owning doctor, for id-keyed lookups
    directory: RwLock<HashMap<Uuid, Uuid>>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self {
            shards: RwLock::new(HashMap::new()),
            directory: RwLock::new(HashMap::new()),
        }
    }

    async fn shard(&self, doctor_id: Uuid) -> Arc<Mutex<DoctorShard>> {
        if let Some(shard) = self.shards.read().await.get(&doctor_id) {
            return Arc::clone(shard);
        }
        let mut shards = self.shards.write().await;
        Arc::clone(shards.entry(doctor_id).or_default())
    }

    async fn doctor_for(&self, appointment_id: Uuid) -> Result<Uuid, StorageError> {
        self.directory
            .read()
            .await
            .get(&appointment_id)
            .copied()
            .ok_or(StorageError::NotFound)
    }
}

impl Default for ScheduleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppointmentRepository for ScheduleStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StorageError> {
        let shard = self.shard(appointment.doctor_id).await;
        let mut shard = shard.lock().await;

        let key = appointment.slot_key();
        if shard.appointments.contains_key(&key) {
            debug!(
                "Duplicate slot for doctor {} at {} {}",
                appointment.doctor_id, appointment.date, appointment.hour
            );
            return Err(StorageError::DuplicateSlot);
        }

        shard.by_id.insert(appointment.id, key);
        shard.appointments.insert(key, appointment.clone());
        self.directory
            .write()
            .await
            .insert(appointment.id, appointment.doctor_id);

        Ok(appointment)
    }

    async fn remove(&self, id: Uuid) -> Result<Appointment, StorageError> {
        let doctor_id = self.doctor_for(id).await?;
        let shard = self.shard(doctor_id).await;
        let mut shard = shard.lock().await;

        let key = shard.by_id.remove(&id).ok_or(StorageError::NotFound)?;
        let removed = shard
            .appointments
            .remove(&key)
            .ok_or(StorageError::NotFound)?;
        self.directory.write().await.remove(&id);

        Ok(removed)
    }

    async fn get(&self, id: Uuid) -> Result<Appointment, StorageError> {
        let doctor_id = self.doctor_for(id).await?;
        let shard = self.shard(doctor_id).await;
        let shard = shard.lock().await;

        let key = shard.by_id.get(&id).ok_or(StorageError::NotFound)?;
        shard
            .appointments
            .get(key)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn update_clinical(
        &self,
        id: Uuid,
        clinical: ClinicalNotes,
        flags: Option<AppointmentFlags>,
    ) -> Result<Appointment, StorageError> {
        let doctor_id = self.doctor_for(id).await?;
        let shard = self.shard(doctor_id).await;
        let mut shard = shard.lock().await;

        let key = *shard.by_id.get(&id).ok_or(StorageError::NotFound)?;
        let appointment = shard
            .appointments
            .get_mut(&key)
            .ok_or(StorageError::NotFound)?;

        appointment.clinical.merge(clinical);
        if let Some(flags) = flags {
            appointment.flags = flags;
        }
        appointment.updated_at = Utc::now();

        Ok(appointment.clone())
    }

    async fn for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StorageError> {
        let shard = self.shard(doctor_id).await;
        let shard = shard.lock().await;
        Ok(shard.appointments.values().cloned().collect())
    }

    async fn for_doctor_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, StorageError> {
        let shard = self.shard(doctor_id).await;
        let shard = shard.lock().await;
        Ok(shard
            .appointments
            .values()
            .filter(|appointment| appointment.date == date)
            .cloned()
            .collect())
    }

    async fn for_doctor_weekday_from(
        &self,
        doctor_id: Uuid,
        weekday: Weekday,
        from: NaiveDate,
    ) -> Result<Vec<Appointment>, StorageError> {
        let shard = self.shard(doctor_id).await;
        let shard = shard.lock().await;
        Ok(shard
            .appointments
            .values()
            .filter(|appointment| {
                appointment.date >= from && day_of_week(appointment.date) == weekday
            })
            .cloned()
            .collect())
    }

    async fn for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StorageError> {
        let shards: Vec<Arc<Mutex<DoctorShard>>> =
            self.shards.read().await.values().cloned().collect();

        let mut results = Vec::new();
        for shard in shards {
            let shard = shard.lock().await;
            results.extend(
                shard
                    .appointments
                    .values()
                    .filter(|appointment| appointment.patient_id == patient_id)
                    .cloned(),
            );
        }
        results.sort_by_key(|appointment| appointment.slot_key());
        Ok(results)
    }
}

#[async_trait]
impl AvailabilityRepository for ScheduleStore {
    async fn template(&self, doctor_id: Uuid) -> Result<WeeklyTemplate, StorageError> {
        let shard = self.shard(doctor_id).await;
        let shard = shard.lock().await;
        Ok(shard.template.clone())
    }

    async fn union_slots(
        &self,
        doctor_id: Uuid,
        weekday: Weekday,
        slots: Vec<TimeSlot>,
    ) -> Result<WeeklyTemplate, StorageError> {
        let shard = self.shard(doctor_id).await;
        let mut shard = shard.lock().await;
        shard.template.union_slots(weekday, slots);
        Ok(shard.template.clone())
    }

    async fn remove_slot(
        &self,
        doctor_id: Uuid,
        weekday: Weekday,
        start_time: NaiveTime,
    ) -> Result<WeeklyTemplate, StorageError> {
        let shard = self.shard(doctor_id).await;
        let mut shard = shard.lock().await;
        if !shard.template.remove_slot(weekday, start_time) {
            return Err(StorageError::NotFound);
        }
        Ok(shard.template.clone())
    }

    async fn replace_slots(
        &self,
        doctor_id: Uuid,
        slots: BTreeMap<Weekday, Vec<TimeSlot>>,
    ) -> Result<WeeklyTemplate, StorageError> {
        let shard = self.shard(doctor_id).await;
        let mut shard = shard.lock().await;
        shard.template.slots = slots;
        Ok(shard.template.clone())
    }

    async fn mark_unavailable(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), StorageError> {
        let shard = self.shard(doctor_id).await;
        let mut shard = shard.lock().await;
        shard.template.mark_unavailable(date);
        Ok(())
    }

    async fn clear_unavailable(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), StorageError> {
        let shard = self.shard(doctor_id).await;
        let mut shard = shard.lock().await;
        if !shard.template.clear_unavailable(date) {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
