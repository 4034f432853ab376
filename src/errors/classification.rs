use super::types::GuardianError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl GuardianError {
    /// Classify this error so callers can tell rejections from transient failures.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Retryable errors
            GuardianError::Storage(_) => ErrorClassification {
                error_type: "StorageError",
                retryable: true,
            },
            GuardianError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                retryable: true,
            },
            GuardianError::Notification(_) => ErrorClassification {
                error_type: "NotificationError",
                retryable: true,
            },
            GuardianError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: true,
            },

            // Non-retryable errors
            GuardianError::Validation { .. } => ErrorClassification {
                error_type: "ValidationError",
                retryable: false,
            },
            GuardianError::Config(_) => ErrorClassification {
                error_type: "ConfigurationError",
                retryable: false,
            },
            GuardianError::Corruption(_) => ErrorClassification {
                error_type: "RecoverableCorruption",
                retryable: false,
            },
            GuardianError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
            },
            GuardianError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
            },
            GuardianError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: false,
            },
        }
    }
}
