// Market data processing modules
pub mod measurement_store;

pub use measurement_store::MeasurementStore;
