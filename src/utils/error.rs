// src/utils/error.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Custom error details for additional context
pub type ErrorDetails = HashMap<String, serde_json::Value>;

/// Main error type for the analytics core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsError {
    pub message: String,
    pub details: Option<Box<ErrorDetails>>,
    pub status: Option<u16>,
    pub error_code: Option<String>,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Fewer points than the statistical minimum.
    InsufficientData,
    /// Input the statistics cannot be computed over (non-finite values).
    DegenerateInput,
    /// The metric store fetch failed.
    UpstreamUnavailable,
    ValidationError,
    ConfigurationError,
    AuthorizationError,
    NotFoundError,
    SerializationError,
    ServiceUnavailable,
    #[default]
    Internal,
}

impl fmt::Display for AnalyticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AnalyticsError {}

impl AnalyticsError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            status: None,
            error_code: None,
            kind,
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(Box::new(details));
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, error_code: impl Into<String>) -> Self {
        self.error_code = Some(error_code.into());
        self
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Looks up a single detail value by key.
    pub fn detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.details.as_ref().and_then(|d| d.get(key))
    }

    // Convenience constructors for common error types
    pub fn insufficient_data(message: impl Into<String>, required: usize, actual: usize) -> Self {
        let mut details = ErrorDetails::new();
        details.insert("required".to_string(), serde_json::json!(required));
        details.insert("actual".to_string(), serde_json::json!(actual));

        Self::new(ErrorKind::InsufficientData, message)
            .with_details(details)
            .with_status(422)
            .with_code("INSUFFICIENT_DATA")
    }

    pub fn degenerate_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DegenerateInput, message)
            .with_status(422)
            .with_code("DEGENERATE_INPUT")
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamUnavailable, message)
            .with_status(502)
            .with_code("UPSTREAM_UNAVAILABLE")
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
            .with_status(400)
            .with_code("VALIDATION_ERROR")
    }

    pub fn configuration_error<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::ConfigurationError, message)
            .with_status(500)
            .with_code("CONFIG_ERROR")
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthorizationError, message)
            .with_status(403)
            .with_code("ACCESS_DENIED")
    }

    pub fn not_found<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::NotFoundError, message)
            .with_status(404)
            .with_code("NOT_FOUND")
    }

    pub fn serialization_error<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::SerializationError, message)
            .with_status(500)
            .with_code("SERIALIZATION_ERROR")
    }

    pub fn service_unavailable<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
            .with_status(503)
            .with_code("SERVICE_UNAVAILABLE")
    }

    pub fn internal_error<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::Internal, message)
            .with_status(500)
            .with_code("INTERNAL_ERROR")
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        AnalyticsError::serialization_error(format!("JSON error: {}", err))
    }
}

// Helper macro for creating errors with context
#[macro_export]
macro_rules! analytics_error {
    ($kind:expr, $msg:expr) => {
        $crate::utils::AnalyticsError::new($kind, $msg)
    };
    ($kind:expr, $msg:expr, $($key:expr => $value:expr),+) => {{
        let mut details = std::collections::HashMap::new();
        $(
            details.insert($key.to_string(), serde_json::json!($value));
        )+
        $crate::utils::AnalyticsError::new($kind, $msg).with_details(details)
    }};
}
