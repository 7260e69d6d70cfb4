use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("{message}")]
    InputError { message: String },

    #[error("No A record found for this domain")]
    DnsNotFound,

    #[error("Found IP: {found}, expected: {expected}")]
    DnsMismatch { found: String, expected: String },

    // detail 只進日誌，不顯示給使用者
    #[error("Failed to check DNS. Please try again.")]
    DnsTransport { detail: String },

    #[error("DNS validation timed out after {attempts} attempts. Last result: {last_result}")]
    ValidationTimeout { attempts: u32, last_result: String },

    #[error("Validation cancelled by user{}", last_check_suffix(.last_result))]
    ValidationCancelled { last_result: Option<String> },

    #[error("Illegal status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Please validate DNS before submitting")]
    DomainNotVerified,

    #[error("Domain backend returned {status}: {message}")]
    BackendError { status: u16, message: String },
}

fn last_check_suffix(last_result: &Option<String>) -> String {
    match last_result {
        Some(message) => format!(". Last check: {}", message),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Dns,
    Network,
    Configuration,
    Data,
    State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CrmError {
    pub fn input(message: impl Into<String>) -> Self {
        CrmError::InputError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CrmError::InputError { .. } => ErrorCategory::Input,
            CrmError::DnsNotFound
            | CrmError::DnsMismatch { .. }
            | CrmError::DnsTransport { .. }
            | CrmError::ValidationTimeout { .. }
            | CrmError::ValidationCancelled { .. } => ErrorCategory::Dns,
            CrmError::ApiError(_) | CrmError::BackendError { .. } => ErrorCategory::Network,
            CrmError::ConfigError { .. }
            | CrmError::ConfigValidationError { .. }
            | CrmError::InvalidConfigValueError { .. }
            | CrmError::MissingConfigError { .. } => ErrorCategory::Configuration,
            CrmError::CsvError(_)
            | CrmError::IoError(_)
            | CrmError::SerializationError(_)
            | CrmError::ProcessingError { .. } => ErrorCategory::Data,
            CrmError::InvalidTransition { .. } | CrmError::DomainNotVerified => {
                ErrorCategory::State
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CrmError::ValidationCancelled { .. } => ErrorSeverity::Low,
            CrmError::DnsNotFound
            | CrmError::DnsMismatch { .. }
            | CrmError::DnsTransport { .. }
            | CrmError::ApiError(_) => ErrorSeverity::Medium,
            CrmError::ConfigError { .. }
            | CrmError::ConfigValidationError { .. }
            | CrmError::InvalidConfigValueError { .. }
            | CrmError::MissingConfigError { .. }
            | CrmError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// DNS 傳播期間的失敗都可以重試；逾時與取消則結束這一輪驗證
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CrmError::DnsNotFound
                | CrmError::DnsMismatch { .. }
                | CrmError::DnsTransport { .. }
                | CrmError::ApiError(_)
        )
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            CrmError::InputError { .. } => "Correct the input and try again".to_string(),
            CrmError::DnsNotFound => {
                "Add an A record for the subdomain at your DNS provider; propagation can take a few minutes".to_string()
            }
            CrmError::DnsMismatch { expected, .. } => {
                format!("Point the A record at {} and wait for DNS propagation", expected)
            }
            CrmError::DnsTransport { .. } | CrmError::ApiError(_) => {
                "Check your network connection; the check will be retried".to_string()
            }
            CrmError::ValidationTimeout { .. } | CrmError::ValidationCancelled { .. } => {
                "Check your DNS settings and retry the validation when ready".to_string()
            }
            CrmError::DomainNotVerified => "Run the domain validation first".to_string(),
            CrmError::InvalidTransition { .. } => {
                "Start a new validation run instead".to_string()
            }
            CrmError::BackendError { .. } => {
                "Check the backend logs or contact support".to_string()
            }
            CrmError::ConfigError { .. }
            | CrmError::ConfigValidationError { .. }
            | CrmError::InvalidConfigValueError { .. }
            | CrmError::MissingConfigError { .. } => {
                "Fix the configuration file and run again".to_string()
            }
            CrmError::CsvError(_)
            | CrmError::SerializationError(_)
            | CrmError::ProcessingError { .. } => {
                "Make sure the input file is valid JSON or CSV".to_string()
            }
            CrmError::IoError(_) => "Check file paths and permissions".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CrmError::ApiError(_) => "Could not reach the server".to_string(),
            CrmError::IoError(e) => format!("File access failed: {}", e),
            CrmError::BackendError { message, .. } => message.clone(),
            CrmError::CsvError(_) | CrmError::SerializationError(_) => {
                "The input data could not be read".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrmError>;
