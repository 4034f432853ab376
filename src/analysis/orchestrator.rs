use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use serde::Serialize;
use crate::config::{GuardianConfig, PolicyConfig};
use crate::db::{CallGuard, Database};
use crate::errors::GuardianError;
use crate::memory::{ShortTermStore, StmState};
use crate::models::{AnalysisResult, Incident, MetricsSnapshot, PipelineReport};
use crate::policy::{aggregate, evaluate};
use tracing::{debug, info, warn};

/// Health of each memory tier as of its last operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub stm_ok: bool,
    pub ltm_ok: bool,
}

pub struct Analyzer {
    policy: Arc<PolicyConfig>,
    stm: Arc<ShortTermStore>,
    ltm: Database,
    storage_timeout: Duration,
    top_anomalies: usize,
}

impl Analyzer {
    /// Open both stores from configuration. LTM schema verification and any
    /// corruption recovery happen here, before the first request.
    pub async fn open(config: &GuardianConfig) -> Result<Self, GuardianError> {
        let storage = &config.storage;
        let ltm_path = storage.ltm_path.clone();
        let recreate = storage.recreate_ltm_on_corruption;
        let timeout = storage.timeout();
        let ltm = tokio::task::spawn_blocking(move || Database::open(&ltm_path, recreate, timeout))
            .await
            .map_err(|e| GuardianError::Internal(format!("LTM open task failed: {}", e)))??;

        let stm = ShortTermStore::new(&storage.stm_path);
        let state = stm.read().await;
        info!(
            stm = %storage.stm_path.display(),
            ltm = %storage.ltm_path.display(),
            total_analyzed = state.total_analyzed,
            "Memory stores ready"
        );

        Ok(Self::new(
            config.policy.clone(),
            stm,
            ltm,
            storage.timeout(),
            storage.top_anomalies,
        ))
    }

    pub fn new(
        policy: PolicyConfig,
        stm: ShortTermStore,
        ltm: Database,
        storage_timeout: Duration,
        top_anomalies: usize,
    ) -> Self {
        Self {
            policy: Arc::new(policy),
            stm: Arc::new(stm),
            ltm,
            storage_timeout,
            top_anomalies,
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn ltm(&self) -> &Database {
        &self.ltm
    }

    /// Evaluate one report and record it.
    ///
    /// The incident must reach the LTM or the call fails with a storage
    /// error. The STM update afterwards is best-effort.
    pub async fn analyze(&self, report: &PipelineReport) -> Result<AnalysisResult, GuardianError> {
        report.validate()?;

        let anomalies = evaluate(report, &self.policy);
        let assessment = aggregate(&anomalies);
        let result = AnalysisResult {
            pipeline_id: report.pipeline_id.clone(),
            status: report.status,
            anomalies,
            severity: assessment.severity,
            recommendation: assessment.recommendation,
            escalate_to_supervisor: assessment.escalate,
            timestamp: Utc::now(),
        };

        let (stored_report, stored_result) = (report.clone(), result.clone());
        let incident_id = self
            .with_ltm("append", move |db, guard| db.append_incident(&stored_report, &stored_result, &guard))
            .await?;
        debug!(pipeline_id = %result.pipeline_id, incident_id, "Incident recorded");

        match tokio::time::timeout(
            self.storage_timeout,
            self.stm.record(&result.pipeline_id, result.severity, result.timestamp),
        ).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(pipeline_id = %result.pipeline_id, error = %e, "STM update failed"),
            Err(_) => warn!(pipeline_id = %result.pipeline_id, "STM update timed out"),
        }

        info!(
            pipeline_id = %result.pipeline_id,
            severity = %result.severity,
            anomalies = result.anomalies.len(),
            escalate = result.escalate_to_supervisor,
            "Analysis complete"
        );
        Ok(result)
    }

    pub async fn metrics(&self) -> Result<MetricsSnapshot, GuardianError> {
        let top_n = self.top_anomalies;
        self.with_ltm("metrics", move |db, guard| db.query_metrics(top_n, &guard)).await
    }

    pub async fn recent_incidents(&self, limit: usize) -> Result<Vec<Incident>, GuardianError> {
        self.with_ltm("incidents", move |db, guard| db.recent_incidents(limit, &guard)).await
    }

    pub async fn stm_state(&self) -> StmState {
        self.stm.read().await
    }

    pub fn status(&self) -> StoreStatus {
        StoreStatus {
            stm_ok: self.stm.is_healthy(),
            ltm_ok: self.ltm.is_healthy(),
        }
    }

    /// Run a blocking LTM call on the blocking pool, bounded by the storage timeout.
    ///
    /// The call sees the same deadline through its guard, so a write that
    /// is reported as timed out is never committed afterwards.
    async fn with_ltm<T, F>(&self, op: &'static str, f: F) -> Result<T, GuardianError>
    where
        T: Send + 'static,
        F: FnOnce(Database, CallGuard) -> Result<T, GuardianError> + Send + 'static,
    {
        let db = self.ltm.clone();
        let guard = CallGuard::new(self.storage_timeout);
        let task_guard = guard.clone();
        let mut handle = tokio::task::spawn_blocking(move || f(db, task_guard));

        let joined = match tokio::time::timeout(self.storage_timeout, &mut handle).await {
            Ok(joined) => joined,
            Err(_) if guard.abandon() => {
                warn!(op, timeout_ms = self.storage_timeout.as_millis() as u64, "LTM call timed out");
                return self.ltm.track(Err(GuardianError::Storage(format!(
                    "LTM {} timed out after {}ms",
                    op,
                    self.storage_timeout.as_millis()
                ))));
            }
            // Commit already under way; its outcome stands.
            Err(_) => handle.await,
        };
        match joined {
            Ok(result) => result,
            Err(e) => self.ltm.track(Err(GuardianError::Internal(format!("LTM {} task failed: {}", op, e)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnomalyKind, OverallSeverity, RunStatus};
    use tempfile::TempDir;

    fn analyzer(dir: &TempDir) -> Analyzer {
        let ltm = Database::open(&dir.path().join("memory.db"), true, Duration::from_millis(500)).unwrap();
        let stm = ShortTermStore::new(dir.path().join("memory.json"));
        Analyzer::new(PolicyConfig::default(), stm, ltm, Duration::from_secs(5), 5)
    }

    fn report() -> PipelineReport {
        PipelineReport {
            pipeline_id: "build-1".into(),
            status: RunStatus::Success,
            duration_seconds: 120.0,
            logs: String::new(),
            vulnerabilities: vec![],
            branch: "feature/x".into(),
            commit_sha: "abc123".into(),
            test_coverage_percent: Some(95.0),
            is_direct_push: false,
            pr_approved: Some(true),
            pr_reviewers_count: Some(2),
        }
    }

    fn kinds(result: &AnalysisResult) -> Vec<AnomalyKind> {
        result.anomalies.iter().map(|a| a.kind).collect()
    }

    #[tokio::test]
    async fn test_scenario_a_critical_direct_push() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer(&dir);
        let mut r = report();
        r.status = RunStatus::Failed;
        r.test_coverage_percent = Some(65.0);
        r.branch = "main".into();
        r.is_direct_push = true;
        r.vulnerabilities = vec!["CVE-X".into()];

        let result = analyzer.analyze(&r).await.unwrap();
        let found = kinds(&result);
        for expected in [
            AnomalyKind::SecurityVulnerability,
            AnomalyKind::BranchProtectionViolation,
            AnomalyKind::InsufficientTestCoverage,
            AnomalyKind::BuildFailure,
        ] {
            assert!(found.contains(&expected), "missing {:?}", expected);
        }
        assert_eq!(result.severity, OverallSeverity::Critical);
        assert!(result.escalate_to_supervisor);
    }

    #[tokio::test]
    async fn test_scenario_b_clean_feature_branch() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer(&dir);
        let result = analyzer.analyze(&report()).await.unwrap();
        assert!(result.anomalies.is_empty());
        assert_eq!(result.severity, OverallSeverity::None);
        assert!(!result.escalate_to_supervisor);
    }

    #[tokio::test]
    async fn test_scenario_c_unapproved_pr_on_protected_branch() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer(&dir);
        let mut r = report();
        r.test_coverage_percent = Some(82.0);
        r.branch = "main".into();
        r.pr_approved = Some(false);
        r.pr_reviewers_count = Some(0);

        let result = analyzer.analyze(&r).await.unwrap();
        assert_eq!(kinds(&result), vec![AnomalyKind::PrNotApproved]);
        assert_eq!(result.severity, OverallSeverity::Critical);
        assert!(result.escalate_to_supervisor);
    }

    #[tokio::test]
    async fn test_analysis_updates_both_tiers() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer(&dir);
        analyzer.analyze(&report()).await.unwrap();
        let mut failed = report();
        failed.pipeline_id = "build-2".into();
        failed.status = RunStatus::Failed;
        analyzer.analyze(&failed).await.unwrap();

        let state = analyzer.stm_state().await;
        assert_eq!(state.total_analyzed, 2);
        assert_eq!(state.alert_count, 1);
        assert_eq!(state.last_pipeline.as_deref(), Some("build-2"));

        let metrics = analyzer.metrics().await.unwrap();
        assert_eq!(metrics.total_pipelines_analyzed, 2);
        assert_eq!(metrics.high_severity_incidents, 1);
        assert!((metrics.success_rate_percent - 50.0).abs() < 1e-9);

        let incidents = analyzer.recent_incidents(10).await.unwrap();
        assert_eq!(incidents[0].result.pipeline_id, "build-2");
        assert_eq!(analyzer.status(), StoreStatus { stm_ok: true, ltm_ok: true });
    }

    #[tokio::test]
    async fn test_invalid_report_is_rejected_and_not_persisted() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer(&dir);
        let mut r = report();
        r.pipeline_id = "  ".into();

        let err = analyzer.analyze(&r).await.unwrap_err();
        assert_eq!(err.field(), Some("pipeline_id"));
        assert_eq!(analyzer.metrics().await.unwrap().total_pipelines_analyzed, 0);
        assert_eq!(analyzer.stm_state().await.total_analyzed, 0);
    }

    #[tokio::test]
    async fn test_ltm_failure_surfaces_storage_error() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer(&dir);
        {
            let conn = analyzer.ltm().conn();
            let conn = conn.lock().unwrap();
            conn.execute_batch("DROP TABLE incident_anomalies; DROP TABLE incidents;").unwrap();
        }

        let err = analyzer.analyze(&report()).await.unwrap_err();
        assert!(matches!(err, GuardianError::Storage(_)));
        assert!(err.classify().retryable);
        assert!(!analyzer.status().ltm_ok);
        // STM is only touched after the incident is durable
        assert_eq!(analyzer.stm_state().await.total_analyzed, 0);
    }

    #[tokio::test]
    async fn test_ltm_call_times_out() {
        let dir = TempDir::new().unwrap();
        let ltm = Database::open(&dir.path().join("memory.db"), true, Duration::from_millis(500)).unwrap();
        let stm = ShortTermStore::new(dir.path().join("memory.json"));
        let analyzer = Analyzer::new(PolicyConfig::default(), stm, ltm, Duration::from_millis(50), 5);

        let conn = analyzer.ltm().conn();
        let guard = conn.lock().unwrap();
        let err = analyzer.metrics().await.unwrap_err();
        assert!(matches!(err, GuardianError::Storage(_)));
        assert!(!analyzer.status().ltm_ok);
        drop(guard);
    }

    #[tokio::test]
    async fn test_timed_out_append_is_not_committed() {
        let dir = TempDir::new().unwrap();
        let ltm = Database::open(&dir.path().join("memory.db"), true, Duration::from_millis(500)).unwrap();
        let stm = ShortTermStore::new(dir.path().join("memory.json"));
        let analyzer = Analyzer::new(PolicyConfig::default(), stm, ltm, Duration::from_millis(50), 5);

        let conn = analyzer.ltm().conn();
        let held = conn.lock().unwrap();
        let err = analyzer.analyze(&report()).await.unwrap_err();
        assert!(matches!(err, GuardianError::Storage(_)));
        drop(held);

        // Give the blocking task time to notice and give up
        tokio::time::sleep(Duration::from_millis(300)).await;
        let count: i64 = conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(analyzer.stm_state().await.total_analyzed, 0);
    }

    #[tokio::test]
    async fn test_stm_failure_does_not_fail_analysis() {
        let dir = TempDir::new().unwrap();
        let ltm = Database::open(&dir.path().join("memory.db"), true, Duration::from_millis(500)).unwrap();
        // A directory where the STM file should be makes every write fail
        let stm_path = dir.path().join("stm");
        std::fs::create_dir(&stm_path).unwrap();
        let analyzer = Analyzer::new(
            PolicyConfig::default(),
            ShortTermStore::new(&stm_path),
            ltm,
            Duration::from_secs(5),
            5,
        );

        let result = analyzer.analyze(&report()).await.unwrap();
        assert_eq!(result.severity, OverallSeverity::None);
        assert_eq!(analyzer.metrics().await.unwrap().total_pipelines_analyzed, 1);
        assert!(!analyzer.status().stm_ok);
    }

    #[tokio::test]
    async fn test_open_from_config() {
        let dir = TempDir::new().unwrap();
        let mut config = GuardianConfig::default();
        config.storage.stm_path = dir.path().join("data").join("memory.json");
        config.storage.ltm_path = dir.path().join("data").join("memory.db");

        let analyzer = Analyzer::open(&config).await.unwrap();
        analyzer.analyze(&report()).await.unwrap();
        assert!(config.storage.ltm_path.exists());
        assert!(config.storage.stm_path.exists());
    }
}
