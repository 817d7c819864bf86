// Raw trade buffering
pub mod market_data;

// Indicator cascade and cross-symbol correlation
pub mod analytics;

// Scheduler, workers and system orchestrator
pub mod system;
