use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use crate::errors::GuardianError;
use crate::models::{AnalysisResult, Anomaly, AnomalyKind, Incident, OverallSeverity, PipelineReport, RunStatus, Severity};
use super::{CallGuard, Database};

impl Database {
    /// Durably record one analysis. Either the incident and all of its
    /// anomalies are committed, or nothing is. Nothing is committed once
    /// the guard has expired.
    pub fn append_incident(
        &self,
        report: &PipelineReport,
        result: &AnalysisResult,
        guard: &CallGuard,
    ) -> Result<i64, GuardianError> {
        let outcome = self
            .lock_within(guard)
            .and_then(|mut conn| insert_incident(&mut conn, report, result, guard));
        self.track(outcome)
    }

    /// Most recent incidents first, each with anomalies in detection order.
    pub fn recent_incidents(&self, limit: usize, guard: &CallGuard) -> Result<Vec<Incident>, GuardianError> {
        let outcome = self.lock_within(guard).and_then(|mut conn| {
            let tx = conn.transaction()
                .map_err(|e| GuardianError::Storage(format!("Failed to begin read: {}", e)))?;
            let incidents = load_incidents(&tx, limit)?;
            tx.commit()
                .map_err(|e| GuardianError::Storage(format!("Failed to finish read: {}", e)))?;
            Ok(incidents)
        });
        self.track(outcome)
    }
}

fn insert_incident(
    conn: &mut Connection,
    report: &PipelineReport,
    result: &AnalysisResult,
    guard: &CallGuard,
) -> Result<i64, GuardianError> {
    let failed = |e: rusqlite::Error| GuardianError::Storage(format!("Failed to append incident: {}", e));
    let tx = conn.transaction().map_err(failed)?;
    tx.execute(
        "INSERT INTO incidents (pipeline_id, recorded_at, analyzed_at, status, severity, duration_seconds, branch, commit_sha, anomaly_count, recommendation, escalated) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            result.pipeline_id,
            Utc::now().to_rfc3339(),
            result.timestamp.to_rfc3339(),
            result.status.as_str(),
            result.severity.as_str(),
            report.duration_seconds,
            report.branch,
            report.commit_sha,
            result.anomalies.len() as i64,
            result.recommendation,
            result.escalate_to_supervisor,
        ],
    ).map_err(failed)?;
    let incident_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare(
            "INSERT INTO incident_anomalies (incident_id, position, kind, description, severity) VALUES (?1, ?2, ?3, ?4, ?5)",
        ).map_err(failed)?;
        for (position, anomaly) in result.anomalies.iter().enumerate() {
            stmt.execute(params![
                incident_id,
                position as i64,
                anomaly.kind.as_str(),
                anomaly.description,
                anomaly.severity.as_str(),
            ]).map_err(failed)?;
        }
    }

    // Dropping the transaction rolls it back.
    if !guard.begin_commit() {
        return Err(GuardianError::Storage(format!(
            "Incident for {} rolled back: caller stopped waiting", result.pipeline_id
        )));
    }
    tx.commit().map_err(failed)?;
    Ok(incident_id)
}

struct IncidentRow {
    id: i64,
    pipeline_id: String,
    recorded_at: String,
    analyzed_at: String,
    status: String,
    severity: String,
    duration_seconds: f64,
    branch: String,
    commit_sha: String,
    recommendation: String,
    escalated: bool,
}

fn load_incidents(conn: &Connection, limit: usize) -> Result<Vec<Incident>, GuardianError> {
    let mut stmt = conn.prepare(
        "SELECT id, pipeline_id, recorded_at, analyzed_at, status, severity, duration_seconds, branch, commit_sha, recommendation, escalated FROM incidents ORDER BY id DESC LIMIT ?1",
    ).map_err(|e| GuardianError::Storage(format!("Query failed: {}", e)))?;

    let rows = stmt.query_map(params![limit as i64], |row: &rusqlite::Row| {
        Ok(IncidentRow {
            id: row.get(0)?,
            pipeline_id: row.get(1)?,
            recorded_at: row.get(2)?,
            analyzed_at: row.get(3)?,
            status: row.get(4)?,
            severity: row.get(5)?,
            duration_seconds: row.get(6)?,
            branch: row.get(7)?,
            commit_sha: row.get(8)?,
            recommendation: row.get(9)?,
            escalated: row.get(10)?,
        })
    }).map_err(|e| GuardianError::Storage(format!("Query error: {}", e)))?;

    let mut incidents = Vec::new();
    for row in rows {
        let row = row.map_err(|e| GuardianError::Storage(format!("Row error: {}", e)))?;
        let anomalies = load_anomalies(conn, row.id)?;
        incidents.push(Incident {
            id: row.id,
            recorded_at: parse_timestamp(&row.recorded_at)?,
            branch: row.branch,
            commit_sha: row.commit_sha,
            duration_seconds: row.duration_seconds,
            result: AnalysisResult {
                pipeline_id: row.pipeline_id,
                status: row.status.parse::<RunStatus>()
                    .map_err(|_| GuardianError::Storage(format!("Unrecognized status '{}' in incident {}", row.status, row.id)))?,
                anomalies,
                severity: OverallSeverity::parse(&row.severity)
                    .ok_or_else(|| GuardianError::Storage(format!("Unrecognized severity '{}' in incident {}", row.severity, row.id)))?,
                recommendation: row.recommendation,
                escalate_to_supervisor: row.escalated,
                timestamp: parse_timestamp(&row.analyzed_at)?,
            },
        });
    }
    Ok(incidents)
}

fn load_anomalies(conn: &Connection, incident_id: i64) -> Result<Vec<Anomaly>, GuardianError> {
    let mut stmt = conn.prepare(
        "SELECT kind, description, severity FROM incident_anomalies WHERE incident_id = ?1 ORDER BY position",
    ).map_err(|e| GuardianError::Storage(format!("Query failed: {}", e)))?;

    let rows = stmt.query_map(params![incident_id], |row: &rusqlite::Row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
    }).map_err(|e| GuardianError::Storage(format!("Query error: {}", e)))?;

    let mut anomalies = Vec::new();
    for row in rows {
        let (kind, description, severity) = row.map_err(|e| GuardianError::Storage(format!("Row error: {}", e)))?;
        anomalies.push(Anomaly {
            kind: AnomalyKind::parse(&kind)
                .ok_or_else(|| GuardianError::Storage(format!("Unrecognized anomaly kind '{}'", kind)))?,
            description,
            severity: Severity::parse(&severity)
                .ok_or_else(|| GuardianError::Storage(format!("Unrecognized anomaly severity '{}'", severity)))?,
        });
    }
    Ok(anomalies)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, GuardianError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| GuardianError::Storage(format!("Invalid timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: &str) -> PipelineReport {
        PipelineReport {
            pipeline_id: id.to_string(),
            status: RunStatus::Failed,
            duration_seconds: 450.5,
            logs: String::new(),
            vulnerabilities: vec![],
            branch: "main".to_string(),
            commit_sha: "abc123".to_string(),
            test_coverage_percent: None,
            is_direct_push: false,
            pr_approved: None,
            pr_reviewers_count: None,
        }
    }

    fn result(id: &str, anomalies: Vec<Anomaly>, severity: OverallSeverity) -> AnalysisResult {
        AnalysisResult {
            pipeline_id: id.to_string(),
            status: RunStatus::Failed,
            anomalies,
            severity,
            recommendation: "Fix it".to_string(),
            escalate_to_supervisor: severity.warrants_escalation(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_append_and_read_back() {
        let db = Database::in_memory().unwrap();
        let anomalies = vec![
            Anomaly::new(AnomalyKind::BuildFailure, "Pipeline build failed"),
            Anomaly::new(AnomalyKind::ExcessiveDuration, "slow"),
        ];
        let id = db.append_incident(&report("p1"), &result("p1", anomalies.clone(), OverallSeverity::High), &CallGuard::unbounded()).unwrap();

        let incidents = db.recent_incidents(10, &CallGuard::unbounded()).unwrap();
        assert_eq!(incidents.len(), 1);
        let incident = &incidents[0];
        assert_eq!(incident.id, id);
        assert_eq!(incident.result.pipeline_id, "p1");
        assert_eq!(incident.result.severity, OverallSeverity::High);
        assert!(incident.result.escalate_to_supervisor);
        assert_eq!(incident.result.anomalies, anomalies);
        assert_eq!(incident.duration_seconds, 450.5);
        assert_eq!(incident.branch, "main");
    }

    #[test]
    fn test_recent_incidents_newest_first_and_limited() {
        let db = Database::in_memory().unwrap();
        for i in 0..5 {
            let id = format!("p{}", i);
            db.append_incident(&report(&id), &result(&id, vec![], OverallSeverity::None), &CallGuard::unbounded()).unwrap();
        }
        let incidents = db.recent_incidents(3, &CallGuard::unbounded()).unwrap();
        let ids: Vec<&str> = incidents.iter().map(|i| i.result.pipeline_id.as_str()).collect();
        assert_eq!(ids, vec!["p4", "p3", "p2"]);
    }

    #[test]
    fn test_failed_append_leaves_no_partial_rows() {
        let db = Database::in_memory().unwrap();
        {
            let conn = db.lock().unwrap();
            conn.execute_batch("DROP TABLE incident_anomalies;").unwrap();
        }
        let anomalies = vec![Anomaly::new(AnomalyKind::BuildFailure, "failed")];
        let err = db.append_incident(&report("p1"), &result("p1", anomalies, OverallSeverity::High), &CallGuard::unbounded()).unwrap_err();
        assert!(matches!(err, GuardianError::Storage(_)));
        assert!(!db.is_healthy());

        let conn = db.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM incidents", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_successful_append_restores_health() {
        let db = Database::in_memory().unwrap();
        db.track::<()>(Err(GuardianError::Storage("simulated".into()))).unwrap_err();
        assert!(!db.is_healthy());
        db.append_incident(&report("p1"), &result("p1", vec![], OverallSeverity::None), &CallGuard::unbounded()).unwrap();
        assert!(db.is_healthy());
    }
}
