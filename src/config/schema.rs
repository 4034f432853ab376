use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "branch_protection": {
                "type": "object",
                "properties": {
                    "protected_branches": { "type": "array", "items": { "type": "string", "minLength": 1 } },
                    "require_pull_request": { "type": "boolean" },
                    "min_approvals": { "type": "integer", "minimum": 0 }
                }
            },
            "test_coverage": {
                "type": "object",
                "properties": {
                    "minimum_percentage": { "type": "number", "minimum": 0, "maximum": 100 }
                }
            },
            "build": {
                "type": "object",
                "properties": {
                    "max_duration_seconds": { "type": "number", "minimum": 0 }
                }
            },
            "notifications": {
                "type": "object",
                "properties": {
                    "alert_on": {
                        "type": "array",
                        "items": { "type": "string", "enum": ["critical", "high", "medium", "low"] }
                    },
                    "slack_webhook": { "type": ["string", "null"] },
                    "webhook_url": { "type": ["string", "null"] },
                    "timeout_seconds": { "type": "integer", "minimum": 1 }
                }
            },
            "storage": {
                "type": "object",
                "properties": {
                    "stm_path": { "type": "string" },
                    "ltm_path": { "type": "string" },
                    "timeout_ms": { "type": "integer", "minimum": 1 },
                    "recreate_ltm_on_corruption": { "type": "boolean" },
                    "top_anomalies": { "type": "integer", "minimum": 1 }
                }
            }
        }
    })
});
