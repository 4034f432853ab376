use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct IncidentQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct MemoryStatus {
    pub stm: &'static str,
    pub ltm: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub memory_status: MemoryStatus,
    pub config_loaded: bool,
    pub uptime_seconds: f64,
}

#[derive(Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub built_at: &'static str,
}

/// What a supervisor needs to route pipeline reports to this agent.
#[derive(Serialize)]
pub struct RegistrationResponse {
    pub agent_id: &'static str,
    pub agent_type: &'static str,
    pub status: &'static str,
    pub capabilities: Vec<&'static str>,
    pub endpoints: BTreeMap<&'static str, String>,
    pub policies_enforced: Vec<String>,
    pub notification_channels: Vec<String>,
    pub escalation_severity: Vec<String>,
    pub build: BuildInfo,
}
