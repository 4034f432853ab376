use rusqlite::{params, Connection};
use crate::errors::GuardianError;
use crate::models::{AnomalyCount, MetricsSnapshot};
use super::{CallGuard, Database};

impl Database {
    /// Aggregate metrics over every stored incident, read in one transaction
    /// so concurrent appends are never half-observed.
    pub fn query_metrics(&self, top_n: usize, guard: &CallGuard) -> Result<MetricsSnapshot, GuardianError> {
        let outcome = self.lock_within(guard).and_then(|mut conn| {
            let tx = conn.transaction()
                .map_err(|e| GuardianError::Storage(format!("Failed to begin read: {}", e)))?;
            let snapshot = compute_metrics(&tx, top_n)
                .map_err(|e| GuardianError::Storage(format!("Metrics query failed: {}", e)))?;
            tx.commit()
                .map_err(|e| GuardianError::Storage(format!("Failed to finish read: {}", e)))?;
            Ok(snapshot)
        });
        self.track(outcome)
    }
}

fn compute_metrics(conn: &Connection, top_n: usize) -> rusqlite::Result<MetricsSnapshot> {
    let (total, critical, high, medium, low, clean, succeeded, avg_duration) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(severity = 'critical'), 0),
                COALESCE(SUM(severity = 'high'), 0),
                COALESCE(SUM(severity = 'medium'), 0),
                COALESCE(SUM(severity = 'low'), 0),
                COALESCE(SUM(severity = 'none'), 0),
                COALESCE(SUM(status = 'success'), 0),
                AVG(duration_seconds)
         FROM incidents",
        [],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, Option<f64>>(7)?,
            ))
        },
    )?;

    let mut stmt = conn.prepare(
        "SELECT kind, COUNT(*) AS occurrences, MIN(id) AS first_seen
         FROM incident_anomalies
         GROUP BY kind
         ORDER BY occurrences DESC, first_seen ASC
         LIMIT ?1",
    )?;
    let top_anomalies = stmt
        .query_map(params![top_n as i64], |row| {
            Ok(AnomalyCount {
                kind: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let success_rate_percent = if total == 0 {
        100.0
    } else {
        succeeded as f64 / total as f64 * 100.0
    };

    Ok(MetricsSnapshot {
        total_pipelines_analyzed: total as u64,
        critical_incidents: critical as u64,
        high_severity_incidents: high as u64,
        medium_severity_incidents: medium as u64,
        low_severity_incidents: low as u64,
        clean_incidents: clean as u64,
        success_rate_percent,
        average_duration_seconds: avg_duration.unwrap_or(0.0),
        top_anomalies,
    })
}
