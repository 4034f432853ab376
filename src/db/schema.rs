pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS incidents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pipeline_id TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    analyzed_at TEXT NOT NULL,
    status TEXT NOT NULL,
    severity TEXT NOT NULL,
    duration_seconds REAL NOT NULL,
    branch TEXT NOT NULL,
    commit_sha TEXT NOT NULL,
    anomaly_count INTEGER NOT NULL,
    recommendation TEXT NOT NULL,
    escalated INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS incident_anomalies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    incident_id INTEGER NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    kind TEXT NOT NULL,
    description TEXT NOT NULL,
    severity TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_incidents_pipeline ON incidents(pipeline_id);
CREATE INDEX IF NOT EXISTS idx_incidents_severity ON incidents(severity);
CREATE INDEX IF NOT EXISTS idx_anomalies_incident ON incident_anomalies(incident_id);
CREATE INDEX IF NOT EXISTS idx_anomalies_kind ON incident_anomalies(kind);
";

pub const DROP_TABLES: &str = "
DROP TABLE IF EXISTS incident_anomalies;
DROP TABLE IF EXISTS incidents;
";

/// Columns each table must carry for the store to be usable.
pub const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "incidents",
        &[
            "id", "pipeline_id", "recorded_at", "analyzed_at", "status", "severity",
            "duration_seconds", "branch", "commit_sha", "anomaly_count", "recommendation",
            "escalated",
        ],
    ),
    (
        "incident_anomalies",
        &["id", "incident_id", "position", "kind", "description", "severity"],
    ),
];
