pub mod audit_log;
pub mod cpu_stats;
pub mod okx;

pub use audit_log::{AuditLog, AuditWriter};
pub use cpu_stats::ProcStatSampler;
pub use okx::OkxTradeFeed;
