//! Audit log configuration parsing from environment variables.

use super::{Lookup, parse_var, string_var};
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AuditEnvConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for AuditEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("data"),
        }
    }
}

impl AuditEnvConfig {
    pub(crate) fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        Ok(Self {
            enabled: parse_var(lookup, "AUDIT_ENABLED", true)?,
            dir: PathBuf::from(string_var(lookup, "AUDIT_DIR", "data")),
        })
    }
}
