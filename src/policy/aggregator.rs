use std::collections::HashSet;
use crate::models::{Anomaly, AnomalyKind, OverallSeverity, Severity};

/// Anomaly count at which a report is critical regardless of individual severities.
pub const CRITICAL_ANOMALY_COUNT: usize = 3;

const URGENT_PREAMBLE: &str = "URGENT: Block merge until issues resolved.";
const ALL_CLEAR: &str = "Pipeline passed all checks. No action required.";

/// Overall verdict for one report.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub severity: OverallSeverity,
    pub recommendation: String,
    pub escalate: bool,
}

pub fn aggregate(anomalies: &[Anomaly]) -> Assessment {
    let severity = overall_severity(anomalies);
    Assessment {
        severity,
        recommendation: recommendation(anomalies, severity),
        escalate: severity.warrants_escalation(),
    }
}

/// First matching rule wins:
/// any security finding, any critical anomaly, or three or more anomalies
/// make the report critical; otherwise the most severe anomaly decides.
pub fn overall_severity(anomalies: &[Anomaly]) -> OverallSeverity {
    let has_security = anomalies.iter().any(|a| a.kind == AnomalyKind::SecurityVulnerability);
    let has_critical = anomalies.iter().any(|a| a.severity == Severity::Critical);

    if has_security || has_critical || anomalies.len() >= CRITICAL_ANOMALY_COUNT {
        return OverallSeverity::Critical;
    }

    anomalies
        .iter()
        .map(|a| a.severity)
        .min_by_key(Severity::rank)
        .map(OverallSeverity::from)
        .unwrap_or(OverallSeverity::None)
}

pub fn recommendation(anomalies: &[Anomaly], severity: OverallSeverity) -> String {
    if anomalies.is_empty() {
        return ALL_CLEAR.to_string();
    }

    let mut parts = Vec::new();
    if severity == OverallSeverity::Critical {
        parts.push(URGENT_PREAMBLE.to_string());
    }
    for anomaly in anomalies {
        parts.push(format!("- {}", anomaly.description));
    }

    parts.push("\nRecommended Actions:".to_string());
    let present: HashSet<AnomalyKind> = anomalies.iter().map(|a| a.kind).collect();
    for (kinds, action) in REMEDIATIONS {
        if kinds.iter().any(|k| present.contains(k)) {
            parts.push(format!("• {}", action));
        }
    }

    parts.join("\n")
}

const REMEDIATIONS: &[(&[AnomalyKind], &str)] = &[
    (&[AnomalyKind::SecurityVulnerability], "Update dependencies to patch security vulnerabilities"),
    (&[AnomalyKind::BranchProtectionViolation], "Revert direct push and create a pull request instead"),
    (&[AnomalyKind::InsufficientTestCoverage], "Add more unit tests to meet coverage requirements"),
    (
        &[AnomalyKind::PrNotApproved, AnomalyKind::InsufficientReviewers],
        "Obtain required PR approvals before merging",
    ),
    (&[AnomalyKind::BuildFailure], "Fix failing tests and build errors"),
    (&[AnomalyKind::BuildAborted], "Investigate why the pipeline was aborted and re-run it"),
    (&[AnomalyKind::ExcessiveDuration], "Optimize build pipeline to reduce execution time"),
];
