use std::collections::BTreeMap;
use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};
use crate::api::models::{BuildInfo, RegistrationResponse};
use crate::api::AppState;
use crate::config::PolicyConfig;
use tracing::info;

pub const AGENT_ID: &str = "cicd-guardian-001";

const CAPABILITIES: &[&str] = &[
    "Branch protection enforcement",
    "Pull request validation",
    "Test coverage monitoring",
    "Security vulnerability detection",
    "Build health monitoring",
    "Webhook notifications",
    "Real-time anomaly detection",
    "Metrics and reporting",
];

pub async fn root() -> Json<Value> {
    Json(json!({
        "agent": "CI/CD Guardian",
        "status": "active",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "analyze": "/api/analyze",
            "metrics": "/api/metrics",
            "incidents": "/api/incidents",
            "health": "/api/health",
            "register": "/api/register",
        }
    }))
}

pub async fn register(State(state): State<AppState>, headers: HeaderMap) -> Json<RegistrationResponse> {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let base_url = format!("http://{}", host);

    let endpoints = ["analyze", "metrics", "incidents", "health"]
        .into_iter()
        .map(|name| (name, format!("{}/api/{}", base_url, name)))
        .collect::<BTreeMap<_, _>>();

    let policy = state.analyzer.policy();
    info!(base_url = %base_url, "Agent registration requested");

    Json(RegistrationResponse {
        agent_id: AGENT_ID,
        agent_type: "CI/CD Monitoring & Policy Enforcement",
        status: "active",
        capabilities: CAPABILITIES.to_vec(),
        endpoints,
        policies_enforced: describe_policies(policy),
        notification_channels: state.notifier.channel_names(),
        escalation_severity: policy.notifications.alert_on.iter().map(|s| s.to_string()).collect(),
        build: BuildInfo {
            version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("GIT_HASH"),
            built_at: env!("BUILD_TIMESTAMP"),
        },
    })
}

/// Human-readable summary of the active thresholds.
pub fn describe_policies(policy: &PolicyConfig) -> Vec<String> {
    let branches = policy.branch_protection.protected_branches
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("/");
    let mut policies = Vec::new();
    if policy.branch_protection.require_pull_request {
        policies.push(format!("No direct push to {}", branches));
    }
    policies.push(format!("Minimum {} PR approval(s) required", policy.min_approvals()));
    policies.push(format!("Test coverage >= {}%", policy.min_coverage()));
    policies.push(format!("Build duration threshold: {}s", policy.max_duration()));
    policies.push("Zero vulnerabilities (CVEs)".to_string());
    policies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_default_policies() {
        let policies = describe_policies(&PolicyConfig::default());
        assert_eq!(policies[0], "No direct push to develop/main/master");
        assert!(policies.contains(&"Test coverage >= 80%".to_string()));
        assert!(policies.contains(&"Build duration threshold: 600s".to_string()));
    }
}
