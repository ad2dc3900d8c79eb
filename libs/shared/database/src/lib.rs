pub mod state;
pub mod store;

pub use state::EngineState;
pub use store::{
    AppointmentRepository, AvailabilityRepository, ScheduleStore, StorageError,
};
