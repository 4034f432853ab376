use std::path::Path;
use crate::errors::GuardianError;
use super::types::GuardianConfig;
use super::schema::CONFIG_SCHEMA;
use tracing::{info, warn};

const MAX_CONFIG_BYTES: u64 = 1_048_576;

pub async fn parse_config(path: &Path) -> Result<GuardianConfig, GuardianError> {
    if !path.exists() {
        return Err(GuardianError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(GuardianError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

/// Parse and validate configuration text. Every failure is a configuration error.
pub fn parse_config_str(content: &str) -> Result<GuardianConfig, GuardianError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| GuardianError::Config(format!("Invalid YAML: {}", e)))?;

    // An empty file is a valid "all defaults" config
    let yaml = if yaml.is_null() {
        serde_yaml::Value::Mapping(Default::default())
    } else {
        yaml
    };

    validate_schema(&yaml)?;

    let config: GuardianConfig = serde_yaml::from_value(yaml)
        .map_err(|e| GuardianError::Config(format!("Invalid configuration: {}", e)))?;

    config.validate()?;
    Ok(config)
}

/// Load the file when one is given, otherwise fall back to built-in defaults.
pub async fn load_or_default(path: Option<&Path>) -> Result<GuardianConfig, GuardianError> {
    match path {
        Some(path) => {
            let config = parse_config(path).await?;
            info!(path = %path.display(), "Configuration loaded");
            Ok(config)
        }
        None => {
            info!("No configuration file given, using defaults");
            Ok(GuardianConfig::default())
        }
    }
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), GuardianError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| GuardianError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| GuardianError::Config(format!("Schema compilation error: {}", e)))?;

    if let Err(errors) = compiled.validate(&json_value) {
        // Advisory only; typed parsing and semantic validation are authoritative
        for e in errors {
            warn!(validation_error = %e, path = %e.instance_path, "Config schema warning");
        }
    }

    Ok(())
}
