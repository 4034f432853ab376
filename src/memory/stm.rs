use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use crate::errors::GuardianError;
use crate::models::OverallSeverity;

pub const DEFAULT_AGENT_STATUS: &str = "active";

/// The single "most recent state" record. Overwritten on every analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StmState {
    pub last_pipeline: Option<String>,
    pub alert_count: u64,
    pub last_analyzed: Option<DateTime<Utc>>,
    pub total_analyzed: u64,
    pub agent_status: String,
}

impl Default for StmState {
    fn default() -> Self {
        Self {
            last_pipeline: None,
            alert_count: 0,
            last_analyzed: None,
            total_analyzed: 0,
            agent_status: DEFAULT_AGENT_STATUS.to_string(),
        }
    }
}

impl StmState {
    fn validate(&self) -> Result<(), GuardianError> {
        if self.agent_status.trim().is_empty() {
            return Err(GuardianError::Corruption("agent_status is empty".into()));
        }
        if self.alert_count > self.total_analyzed {
            return Err(GuardianError::Corruption(format!(
                "alert_count {} exceeds total_analyzed {}",
                self.alert_count, self.total_analyzed
            )));
        }
        Ok(())
    }

    /// Fold one finished analysis into the counters.
    pub fn apply(&mut self, pipeline_id: &str, severity: OverallSeverity, at: DateTime<Utc>) {
        self.total_analyzed += 1;
        if severity != OverallSeverity::None {
            self.alert_count += 1;
        }
        self.last_pipeline = Some(pipeline_id.to_string());
        self.last_analyzed = Some(at);
    }
}

/// File-backed, best-effort cache of [`StmState`].
///
/// Reads never fail: a missing file yields a fresh state, an unreadable or
/// malformed one is logged and replaced by a fresh state.
pub struct ShortTermStore {
    path: PathBuf,
    update_lock: Mutex<()>,
    last_read_clean: AtomicBool,
    last_write_ok: AtomicBool,
}

impl ShortTermStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            update_lock: Mutex::new(()),
            last_read_clean: AtomicBool::new(true),
            last_write_ok: AtomicBool::new(true),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False when the last read needed recovery or the last write failed.
    pub fn is_healthy(&self) -> bool {
        self.last_read_clean.load(Ordering::SeqCst) && self.last_write_ok.load(Ordering::SeqCst)
    }

    pub async fn read(&self) -> StmState {
        match self.load().await {
            Ok(Some(state)) => {
                self.last_read_clean.store(true, Ordering::SeqCst);
                state
            }
            Ok(None) => {
                info!(path = %self.path.display(), "STM file not found, starting fresh");
                self.last_read_clean.store(true, Ordering::SeqCst);
                StmState::default()
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "STM corrupted, reinitializing");
                self.last_read_clean.store(false, Ordering::SeqCst);
                StmState::default()
            }
        }
    }

    async fn load(&self) -> Result<Option<StmState>, GuardianError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(GuardianError::Corruption(format!("unreadable: {}", e))),
        };
        let state: StmState = serde_json::from_str(&content)
            .map_err(|e| GuardianError::Corruption(format!("malformed: {}", e)))?;
        state.validate()?;
        Ok(Some(state))
    }

    pub async fn write(&self, state: &StmState) -> Result<(), GuardianError> {
        let result = self.save(state).await;
        self.last_write_ok.store(result.is_ok(), Ordering::SeqCst);
        if let Err(e) = &result {
            error!(path = %self.path.display(), error = %e, "Failed to save STM");
        }
        result
    }

    async fn save(&self, state: &StmState) -> Result<(), GuardianError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Serialized read-modify-write for one finished analysis.
    pub async fn record(
        &self,
        pipeline_id: &str,
        severity: OverallSeverity,
        at: DateTime<Utc>,
    ) -> Result<StmState, GuardianError> {
        let _guard = self.update_lock.lock().await;
        let mut state = self.read().await;
        state.apply(pipeline_id, severity, at);
        self.write(&state).await?;
        debug!(pipeline_id = %pipeline_id, total = state.total_analyzed, "STM updated");
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ShortTermStore {
        ShortTermStore::new(dir.path().join("memory.json"))
    }

    #[tokio::test]
    async fn test_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let stm = store(&dir);
        assert_eq!(stm.read().await, StmState::default());
        assert!(stm.is_healthy());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let stm = store(&dir);
        let mut state = StmState::default();
        state.apply("build-7", OverallSeverity::High, Utc::now());
        stm.write(&state).await.unwrap();
        assert_eq!(stm.read().await, state);
    }

    #[tokio::test]
    async fn test_garbage_file_recovers_to_default() {
        let dir = TempDir::new().unwrap();
        let stm = store(&dir);
        std::fs::write(stm.path(), "{ not json").unwrap();

        let state = stm.read().await;
        assert_eq!(state.total_analyzed, 0);
        assert_eq!(state.alert_count, 0);
        assert!(state.last_pipeline.is_none());
        assert!(!stm.is_healthy());
    }

    #[tokio::test]
    async fn test_missing_required_field_recovers() {
        let dir = TempDir::new().unwrap();
        let stm = store(&dir);
        std::fs::write(stm.path(), r#"{"last_pipeline": "x", "alert_count": 3}"#).unwrap();
        assert_eq!(stm.read().await, StmState::default());
        assert!(!stm.is_healthy());
    }

    #[tokio::test]
    async fn test_wrong_shape_recovers() {
        let dir = TempDir::new().unwrap();
        let stm = store(&dir);
        std::fs::write(stm.path(), "[1, 2, 3]").unwrap();
        assert_eq!(stm.read().await, StmState::default());
    }

    #[tokio::test]
    async fn test_health_restored_after_clean_cycle() {
        let dir = TempDir::new().unwrap();
        let stm = store(&dir);
        std::fs::write(stm.path(), "corrupt").unwrap();
        stm.record("p1", OverallSeverity::None, Utc::now()).await.unwrap();
        assert!(!stm.is_healthy());
        stm.record("p2", OverallSeverity::None, Utc::now()).await.unwrap();
        assert!(stm.is_healthy());
        assert_eq!(stm.read().await.total_analyzed, 2);
    }

    #[tokio::test]
    async fn test_record_counts_alerts_for_any_severity() {
        let dir = TempDir::new().unwrap();
        let stm = store(&dir);
        stm.record("a", OverallSeverity::None, Utc::now()).await.unwrap();
        stm.record("b", OverallSeverity::Medium, Utc::now()).await.unwrap();
        let state = stm.record("c", OverallSeverity::Critical, Utc::now()).await.unwrap();
        assert_eq!(state.total_analyzed, 3);
        assert_eq!(state.alert_count, 2);
        assert_eq!(state.last_pipeline.as_deref(), Some("c"));
        assert!(state.last_analyzed.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_records_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let stm = Arc::new(store(&dir));
        let mut handles = Vec::new();
        for i in 0..20 {
            let stm = stm.clone();
            handles.push(tokio::spawn(async move {
                stm.record(&format!("p{}", i), OverallSeverity::High, Utc::now()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let state = stm.read().await;
        assert_eq!(state.total_analyzed, 20);
        assert_eq!(state.alert_count, 20);
    }

    #[tokio::test]
    async fn test_write_failure_marks_unhealthy() {
        let dir = TempDir::new().unwrap();
        // Parent path is a regular file, so directory creation fails
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let stm = ShortTermStore::new(blocker.join("memory.json"));
        assert!(stm.write(&StmState::default()).await.is_err());
        assert!(!stm.is_healthy());
    }
}
