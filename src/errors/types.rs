use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardianError {
    /// A pipeline report failed boundary validation. Never persisted.
    #[error("Validation error on field '{field}': {message}")]
    Validation { field: String, message: String },

    /// The long-term store could not record or read incidents.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Policy configuration rejected at load time.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A store's backing structure was unreadable. Handled inside the store.
    #[error("Corrupted store: {0}")]
    Corruption(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GuardianError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Name of the offending report field for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for GuardianError {
    fn from(e: rusqlite::Error) -> Self {
        GuardianError::Storage(e.to_string())
    }
}
