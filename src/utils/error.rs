use thiserror::Error;

/// Failures reported by a content source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The backend rejected a create because the record already exists.
    #[error("Duplicate record rejected: {message}")]
    DuplicateKey { message: String },

    #[error("GraphQL error: {}", messages.join("; "))]
    GraphQl { messages: Vec<String> },

    #[error("Content API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Content API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode content API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Injected failure: {message}")]
    Injected { message: String },
}

impl SourceError {
    /// Transport failures and throttling/server responses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, SourceError::DuplicateKey { .. })
    }
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SyncError::Source(e) if e.is_retryable() => ErrorSeverity::Medium,
            SyncError::Source(_) | SyncError::SerializationError(_) => ErrorSeverity::High,
            SyncError::IoError(_) => ErrorSeverity::High,
            SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::ConfigValidationError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            SyncError::Source(SourceError::Status { status: 401, .. })
            | SyncError::Source(SourceError::Status { status: 403, .. }) => {
                "Check that CONTENT_API_TOKEN is valid and has mutation permissions".to_string()
            }
            SyncError::Source(e) if e.is_retryable() => {
                "The content API looks unavailable; retry later or raise --retry-attempts"
                    .to_string()
            }
            SyncError::Source(SourceError::GraphQl { .. }) => {
                "Check the content model for services, citylocations and serviceLocations"
                    .to_string()
            }
            SyncError::Source(_) => "Inspect the content API response above".to_string(),
            SyncError::MissingConfigError { field } => format!(
                "Set {} via the command line, the environment, or the config file",
                field
            ),
            SyncError::InvalidConfigValueError { field, .. }
            | SyncError::ConfigValidationError { field, .. } => {
                format!("Fix the value of {}", field)
            }
            SyncError::ConfigError { .. } => "Check the configuration file".to_string(),
            SyncError::IoError(_) => "Check file paths and permissions".to_string(),
            SyncError::SerializationError(_) => "Report this as a bug".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
