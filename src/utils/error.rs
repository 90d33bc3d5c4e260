use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid trunk id: '{value}'")]
    InvalidTrunkId { value: String },

    #[error("{operation} returned unexpected status {status}: {body}")]
    UnexpectedStatus {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Failed to patch destination trunk {trunk}. Status: {status}")]
    DestinationPatchRejected {
        trunk: String,
        status: u16,
        body: String,
    },

    #[error("Authentication failed: {message}")]
    AuthenticationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Remote,
    Authentication,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 程序結束碼；任何錯誤都不會以 0 結束
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::ApiError(_) => ErrorCategory::Network,
            SyncError::IoError(_) => ErrorCategory::Configuration,
            SyncError::SerializationError(_) => ErrorCategory::Data,
            SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::ConfigValidationError { .. }
            | SyncError::InvalidTrunkId { .. } => ErrorCategory::Configuration,
            SyncError::UnexpectedStatus { status, .. } if *status == 401 || *status == 403 => {
                ErrorCategory::Authentication
            }
            SyncError::UnexpectedStatus { .. } | SyncError::DestinationPatchRejected { .. } => {
                ErrorCategory::Remote
            }
            SyncError::AuthenticationError { .. } => ErrorCategory::Authentication,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路問題通常重試即可
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Authentication => ErrorSeverity::High,
            ErrorCategory::Remote | ErrorCategory::Data => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            SyncError::ApiError(e) if e.is_timeout() => {
                "The PBX did not answer in time".to_string()
            }
            SyncError::ApiError(e) if e.is_connect() => "Could not connect to the PBX".to_string(),
            SyncError::ApiError(_) => "Request to the PBX failed".to_string(),
            SyncError::DestinationPatchRejected { trunk, status, .. } => format!(
                "The PBX refused the new number list for trunk {} (status {}); no routes were changed",
                trunk, status
            ),
            SyncError::UnexpectedStatus {
                operation, status, ..
            } => format!("{} failed with status {}", operation, status),
            SyncError::AuthenticationError { message } => format!("Login failed: {}", message),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the command line flags and the config file",
            ErrorCategory::Network => "Check the PBX address and network connectivity, then retry",
            ErrorCategory::Authentication => {
                "Supply a fresh bearer token or valid admin credentials"
            }
            ErrorCategory::Remote => {
                "Inspect the trunk in the PBX admin console; the destination was not modified beyond what the log reports"
            }
            ErrorCategory::Data => "The PBX returned an unexpected payload; run with --verbose and inspect the response",
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
