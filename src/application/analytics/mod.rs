pub mod correlation_engine;
pub mod indicator_engine;
pub mod pearson;
pub mod series;

pub use correlation_engine::CorrelationEngine;
pub use indicator_engine::{IndicatorEngine, IndicatorSettings};
pub use series::Series;
