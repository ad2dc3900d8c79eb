pub mod appointment;
pub mod error;
pub mod schedule;
pub mod slot;
pub mod template;
