use serde::{Deserialize, Serialize};

/// Severity of a single anomaly, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Returns a numeric rank where lower values indicate higher severity.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed set of policy violations the engine can detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    SecurityVulnerability,
    BranchProtectionViolation,
    PrNotApproved,
    InsufficientTestCoverage,
    BuildFailure,
    BuildAborted,
    InsufficientReviewers,
    ExcessiveDuration,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 8] = [
        AnomalyKind::SecurityVulnerability,
        AnomalyKind::BranchProtectionViolation,
        AnomalyKind::PrNotApproved,
        AnomalyKind::InsufficientTestCoverage,
        AnomalyKind::BuildFailure,
        AnomalyKind::BuildAborted,
        AnomalyKind::InsufficientReviewers,
        AnomalyKind::ExcessiveDuration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityVulnerability => "security_vulnerability",
            Self::BranchProtectionViolation => "branch_protection_violation",
            Self::PrNotApproved => "pr_not_approved",
            Self::InsufficientTestCoverage => "insufficient_test_coverage",
            Self::BuildFailure => "build_failure",
            Self::BuildAborted => "build_aborted",
            Self::InsufficientReviewers => "insufficient_reviewers",
            Self::ExcessiveDuration => "excessive_duration",
        }
    }

    /// Severity every anomaly of this kind carries.
    pub fn severity(&self) -> Severity {
        match self {
            Self::SecurityVulnerability
            | Self::BranchProtectionViolation
            | Self::PrNotApproved
            | Self::InsufficientTestCoverage => Severity::Critical,
            Self::BuildFailure | Self::BuildAborted | Self::InsufficientReviewers => Severity::High,
            Self::ExcessiveDuration => Severity::Medium,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected policy violation for a single pipeline report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub description: String,
    pub severity: Severity,
}

impl Anomaly {
    /// Build an anomaly whose severity follows from its kind.
    pub fn new(kind: AnomalyKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            severity: kind.severity(),
        }
    }
}
