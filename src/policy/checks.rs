use crate::config::PolicyConfig;
use crate::models::{Anomaly, AnomalyKind, PipelineReport, RunStatus};

/// Run every policy check against one report.
///
/// Pure and deterministic. Checks are independent and never short-circuit;
/// the output is ordered by [`AnomalyKind::ALL`], then by input order within a kind.
pub fn evaluate(report: &PipelineReport, config: &PolicyConfig) -> Vec<Anomaly> {
    AnomalyKind::ALL
        .iter()
        .flat_map(|kind| check(*kind, report, config))
        .collect()
}

/// Dispatch a single policy by kind.
pub fn check(kind: AnomalyKind, report: &PipelineReport, config: &PolicyConfig) -> Vec<Anomaly> {
    match kind {
        AnomalyKind::SecurityVulnerability => check_vulnerabilities(report),
        AnomalyKind::BranchProtectionViolation => check_branch_protection(report, config).into_iter().collect(),
        AnomalyKind::PrNotApproved => check_pr_approval(report, config).into_iter().collect(),
        AnomalyKind::InsufficientTestCoverage => check_test_coverage(report, config).into_iter().collect(),
        AnomalyKind::BuildFailure => check_build_failed(report).into_iter().collect(),
        AnomalyKind::BuildAborted => check_build_aborted(report).into_iter().collect(),
        AnomalyKind::InsufficientReviewers => check_reviewers(report, config).into_iter().collect(),
        AnomalyKind::ExcessiveDuration => check_duration(report, config).into_iter().collect(),
    }
}

/// One critical anomaly per reported vulnerability id.
fn check_vulnerabilities(report: &PipelineReport) -> Vec<Anomaly> {
    report
        .vulnerabilities
        .iter()
        .map(|vuln| {
            Anomaly::new(
                AnomalyKind::SecurityVulnerability,
                format!("Security vulnerability detected: {}", vuln),
            )
        })
        .collect()
}

fn check_branch_protection(report: &PipelineReport, config: &PolicyConfig) -> Option<Anomaly> {
    // Direct push wins over whatever approval state the report carries
    let violated = config.is_protected(&report.branch)
        && config.branch_protection.require_pull_request
        && report.is_direct_push;
    violated.then(|| {
        Anomaly::new(
            AnomalyKind::BranchProtectionViolation,
            format!("Direct push to protected branch '{}' is not allowed", report.branch),
        )
    })
}

fn check_pr_approval(report: &PipelineReport, config: &PolicyConfig) -> Option<Anomaly> {
    let violated = config.is_protected(&report.branch)
        && !report.is_direct_push
        && report.pr_approved == Some(false);
    violated.then(|| {
        Anomaly::new(
            AnomalyKind::PrNotApproved,
            format!("Pull request to '{}' was not approved", report.branch),
        )
    })
}

fn check_test_coverage(report: &PipelineReport, config: &PolicyConfig) -> Option<Anomaly> {
    let min = config.min_coverage();
    let coverage = report.test_coverage_percent?;
    (coverage < min).then(|| {
        Anomaly::new(
            AnomalyKind::InsufficientTestCoverage,
            format!("Test coverage ({}%) is below minimum ({}%)", coverage, min),
        )
    })
}

fn check_build_failed(report: &PipelineReport) -> Option<Anomaly> {
    (report.status == RunStatus::Failed)
        .then(|| Anomaly::new(AnomalyKind::BuildFailure, "Pipeline build failed"))
}

fn check_build_aborted(report: &PipelineReport) -> Option<Anomaly> {
    (report.status == RunStatus::Aborted).then(|| {
        Anomaly::new(
            AnomalyKind::BuildAborted,
            "Pipeline build was aborted before completion",
        )
    })
}

/// Applies only to an approved pull request into a protected branch; an
/// unapproved one is already reported as `pr_not_approved`.
fn check_reviewers(report: &PipelineReport, config: &PolicyConfig) -> Option<Anomaly> {
    let in_pr_context = config.is_protected(&report.branch)
        && !report.is_direct_push
        && report.pr_approved == Some(true);
    if !in_pr_context {
        return None;
    }
    let reviewers = report.pr_reviewers_count?;
    let min = config.min_approvals();
    (reviewers < min).then(|| {
        Anomaly::new(
            AnomalyKind::InsufficientReviewers,
            format!("PR has {} reviewer(s), minimum {} required", reviewers, min),
        )
    })
}

fn check_duration(report: &PipelineReport, config: &PolicyConfig) -> Option<Anomaly> {
    let max = config.max_duration();
    (report.duration_seconds > max).then(|| {
        Anomaly::new(
            AnomalyKind::ExcessiveDuration,
            format!(
                "Build duration ({}s) exceeds threshold ({}s)",
                report.duration_seconds, max
            ),
        )
    })
}
