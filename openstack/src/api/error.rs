use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("No suitable endpoint could be found for {service} in region {region:?}")]
    ServiceUnavailable { service: String, region: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Bad request: {0}")]
    Validation(String),

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Timeout after {0:?} while waiting for the resource")]
    Timeout(std::time::Duration),

    #[error("Unexpected status {status:?}, wanted {target:?}")]
    UnexpectedStatus { status: String, target: Vec<String> },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Conflict(_) | ApiError::RateLimited | ApiError::Server { .. } => true,
            // Refused, reset or dropped connections and truncated bodies
            ApiError::Request(e) => {
                e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
            }
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Map a non-success HTTP status and body to an error
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let message = extract_message(&body).unwrap_or(body);
        match status.as_u16() {
            401 => ApiError::Auth(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            429 => ApiError::RateLimited,
            400 | 422 => ApiError::Validation(message),
            s if status.is_server_error() => ApiError::Server { status: s, message },
            s => ApiError::Api { status: s, message },
        }
    }
}

impl From<tfplug::TfplugError> for ApiError {
    fn from(e: tfplug::TfplugError) -> Self {
        match e {
            tfplug::TfplugError::Cancelled => ApiError::Cancelled,
            other => ApiError::Config(other.to_string()),
        }
    }
}

/// OpenStack services wrap error text in a handful of shapes:
/// `{"NeutronError": {"message": ..}}`, `{"badRequest": {"message": ..}}`,
/// `{"faultstring": ..}` (Mistral) or `{"error": {"message": ..}}` (Keystone).
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    if let Some(fault) = object.get("faultstring").and_then(|v| v.as_str()) {
        return Some(fault.to_string());
    }

    object.values().find_map(|inner| {
        inner
            .get("message")
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
    })
}
