// libs/shared/database/src/state.rs
use std::sync::Arc;
use tracing::warn;

use shared_config::AppConfig;
use shared_models::slot::SlotGrid;

use crate::store::{AppointmentRepository, AvailabilityRepository, ScheduleStore};

/// Shared engine state handed to every router: the loaded configuration and
/// the one storage instance behind both repository facets.
pub struct EngineState {
    pub config: AppConfig,
    store: Arc<ScheduleStore>,
}

impl EngineState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: Arc::new(ScheduleStore::new()),
        }
    }

    pub fn appointments(&self) -> Arc<dyn AppointmentRepository> {
        Arc::clone(&self.store) as Arc<dyn AppointmentRepository>
    }

    pub fn availability(&self) -> Arc<dyn AvailabilityRepository> {
        Arc::clone(&self.store) as Arc<dyn AvailabilityRepository>
    }

    pub fn slot_grid(&self) -> SlotGrid {
        SlotGrid::new(self.config.clinic_open, self.config.clinic_close).unwrap_or_else(|e| {
            warn!("Configured clinic hours rejected ({e}), using default grid");
            SlotGrid::default()
        })
    }
}
