use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;
use crate::errors::GuardianError;
use crate::models::OverallSeverity;

/// Everything the service reads from its YAML file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GuardianConfig {
    #[serde(flatten)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl GuardianConfig {
    pub fn validate(&self) -> Result<(), GuardianError> {
        self.policy.validate()?;
        self.storage.validate()
    }
}

/// Policy thresholds. Loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PolicyConfig {
    #[serde(default)]
    pub branch_protection: BranchProtectionConfig,
    #[serde(default)]
    pub test_coverage: TestCoverageConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl PolicyConfig {
    pub fn is_protected(&self, branch: &str) -> bool {
        self.branch_protection.protected_branches.contains(branch)
    }

    pub fn min_approvals(&self) -> u32 {
        self.branch_protection.min_approvals
    }

    pub fn min_coverage(&self) -> f64 {
        self.test_coverage.minimum_percentage
    }

    pub fn max_duration(&self) -> f64 {
        self.build.max_duration_seconds
    }

    /// Reject thresholds that could never be evaluated meaningfully.
    pub fn validate(&self) -> Result<(), GuardianError> {
        let coverage = self.test_coverage.minimum_percentage;
        if !coverage.is_finite() || !(0.0..=100.0).contains(&coverage) {
            return Err(GuardianError::Config(format!(
                "test_coverage.minimum_percentage must be between 0 and 100, got {}",
                coverage
            )));
        }

        let duration = self.build.max_duration_seconds;
        if !duration.is_finite() || duration < 0.0 {
            return Err(GuardianError::Config(format!(
                "build.max_duration_seconds must be a non-negative number, got {}",
                duration
            )));
        }

        if self.branch_protection.protected_branches.iter().any(|b| b.trim().is_empty()) {
            return Err(GuardianError::Config(
                "branch_protection.protected_branches must not contain empty names".into(),
            ));
        }
        if self.branch_protection.protected_branches.is_empty() {
            warn!("No protected branches configured, branch protection checks are disabled");
        }

        if self.notifications.alert_on.contains(&OverallSeverity::None) {
            return Err(GuardianError::Config(
                "notifications.alert_on cannot include 'none'".into(),
            ));
        }
        for (key, url) in [
            ("notifications.slack_webhook", &self.notifications.slack_webhook),
            ("notifications.webhook_url", &self.notifications.webhook_url),
        ] {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(GuardianError::Config(format!(
                        "{} must be an http(s) URL, got '{}'",
                        key, url
                    )));
                }
            }
        }
        if self.notifications.timeout_seconds == 0 {
            return Err(GuardianError::Config(
                "notifications.timeout_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BranchProtectionConfig {
    pub protected_branches: BTreeSet<String>,
    pub require_pull_request: bool,
    pub min_approvals: u32,
}

impl Default for BranchProtectionConfig {
    fn default() -> Self {
        Self {
            protected_branches: ["main", "master", "develop"]
                .into_iter()
                .map(String::from)
                .collect(),
            require_pull_request: true,
            min_approvals: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TestCoverageConfig {
    pub minimum_percentage: f64,
}

impl Default for TestCoverageConfig {
    fn default() -> Self {
        Self { minimum_percentage: 80.0 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    pub max_duration_seconds: f64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { max_duration_seconds: 600.0 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Overall severities that trigger outbound delivery.
    pub alert_on: Vec<OverallSeverity>,
    pub slack_webhook: Option<String>,
    pub webhook_url: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            alert_on: vec![OverallSeverity::Critical, OverallSeverity::High],
            slack_webhook: None,
            webhook_url: None,
            timeout_seconds: 10,
        }
    }
}

impl NotificationConfig {
    pub fn should_notify(&self, severity: OverallSeverity) -> bool {
        self.alert_on.contains(&severity)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub stm_path: PathBuf,
    pub ltm_path: PathBuf,
    /// Upper bound on any single store call.
    pub timeout_ms: u64,
    /// Drop and recreate an unreadable incident database instead of refusing to start.
    pub recreate_ltm_on_corruption: bool,
    pub top_anomalies: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            stm_path: PathBuf::from("./data/memory.json"),
            ltm_path: PathBuf::from("./data/memory.db"),
            timeout_ms: 5000,
            recreate_ltm_on_corruption: true,
            top_anomalies: 5,
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), GuardianError> {
        if self.stm_path.as_os_str().is_empty() || self.ltm_path.as_os_str().is_empty() {
            return Err(GuardianError::Config("storage paths must not be empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(GuardianError::Config("storage.timeout_ms must be greater than zero".into()));
        }
        if self.top_anomalies == 0 {
            return Err(GuardianError::Config("storage.top_anomalies must be greater than zero".into()));
        }
        if !self.recreate_ltm_on_corruption {
            warn!("LTM corruption recovery disabled, a corrupt incident database will block startup");
        }
        Ok(())
    }
}
