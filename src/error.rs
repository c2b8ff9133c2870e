use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("HTTP request failed: {0}")]
    Reqwest(String),
    #[error("Filesystem I/O error: {0}")]
    Io(String),
    #[error("JSON serialization error: {0}")]
    SerdeSerialize(String),
    #[error("JSON parsing error: {0}")]
    SerdeParse(String),
    #[error("API returned an error: status={status}, message='{message}' (Endpoint: {endpoint})")]
    ApiError {
        status: u16,
        message: String,
        endpoint: String,
    },
    #[error("API response structure invalid: {message} (Endpoint: {endpoint})")]
    ApiResponseInvalid { message: String, endpoint: String },
    #[error("Invalid argument provided: {0}")]
    Argument(String),
    #[error("Tokio task join error: {0}")]
    JoinError(String),
    #[error("Timeout during operation: {0}")]
    Timeout(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Unknown job: {0}")]
    UnknownJob(String),
    #[error("Unexpected internal error: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Reqwest(e.to_string())
    }
}
impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}
impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() || e.is_eof() || e.is_syntax() {
            AppError::SerdeParse(e.to_string())
        } else {
            AppError::SerdeSerialize(e.to_string())
        }
    }
}
impl From<JoinError> for AppError {
    fn from(e: JoinError) -> Self {
        AppError::JoinError(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Statuses a mutating endpoint answers with when it refuses the payload
/// itself, as opposed to the caller, the token or the transport.
const REJECTION_STATUSES: [u16; 3] = [400, 413, 422];

impl AppError {
    pub fn response_invalid<S: Into<String>>(message: S, endpoint: &str) -> AppError {
        AppError::ApiResponseInvalid {
            message: message.into(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn api_error<S: Into<String>>(status: u16, message: S, endpoint: &str) -> AppError {
        AppError::ApiError {
            status,
            message: message.into(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, AppError::ApiError { status, .. } if REJECTION_STATUSES.contains(status))
    }

    pub fn detail(&self) -> String {
        match self {
            AppError::ApiError {
                status, message, ..
            } => format!("{} {}", status, message),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_covers_payload_statuses_only() {
        assert!(AppError::api_error(400, "Invalid base62 id", "add_tracks").is_rejection());
        assert!(AppError::api_error(413, "Payload Too Large", "add_tracks").is_rejection());
        assert!(!AppError::api_error(401, "The access token expired", "add_tracks").is_rejection());
        assert!(!AppError::api_error(403, "Insufficient client scope", "add_tracks").is_rejection());
        assert!(!AppError::api_error(404, "Resource not found", "add_tracks").is_rejection());
        assert!(!AppError::api_error(429, "rate limited", "add_tracks").is_rejection());
        assert!(!AppError::Timeout("slow".into()).is_rejection());
    }

    #[test]
    fn detail_is_compact_for_api_errors() {
        let e = AppError::api_error(400, "Invalid base62 id", "add_tracks");
        assert_eq!(e.detail(), "400 Invalid base62 id");
    }
}
