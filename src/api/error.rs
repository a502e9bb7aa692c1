//! Transport and platform error types

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::classify::ErrorCategory;
use super::codes::PlatformErrorCode;

/// A parseable platform response that reports failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    pub code: PlatformErrorCode,
    pub status: String,
    pub message: String,
    /// URL of the request that produced the error
    pub endpoint: String,
}

/// Raw failure of a single pipeline call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The request was abandoned by the timeout stage.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// Transport-level failure before any response arrived.
    #[error("network request failed: {0}")]
    Network(String),

    #[error("could not parse response body: {0}")]
    Parse(String),

    /// Status outside [200, 400). `-1` marks a response that never arrived.
    #[error("HTTP {status} {status_text}")]
    HttpStatus { status: i32, status_text: String },

    #[error("{} ({}: {}) for {}", .0.message, .0.code, .0.status, .0.endpoint)]
    Platform(PlatformError),

    /// Credentials are unusable; the user has to log in again.
    #[error("fatal token error: {0}")]
    FatalToken(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn platform_code(&self) -> Option<PlatformErrorCode> {
        match self {
            ApiError::Platform(e) => Some(e.code),
            _ => None,
        }
    }
}

/// A pipeline failure together with its user-facing category.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{category}: {source}")]
pub struct ServiceError {
    pub category: ErrorCategory,
    #[source]
    pub source: ApiError,
}

#[derive(Debug, Deserialize)]
struct PlatformEnvelope {
    #[serde(rename = "ErrorCode")]
    error_code: PlatformErrorCode,
    #[serde(rename = "ErrorStatus", default)]
    error_status: Option<String>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    #[allow(dead_code)]
    error: Value,
    error_description: String,
}

/// Recognized failure shapes of a decoded response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorPayload {
    /// `{ErrorCode, ErrorStatus, Message}` with a non-success code.
    Platform {
        code: PlatformErrorCode,
        status: String,
        message: String,
    },
    /// `{error, error_description}`, returned during maintenance.
    OAuth { description: String },
}

impl ErrorPayload {
    /// Decode `body` into one of the known failure shapes.
    ///
    /// Anything else, including successful envelopes, is `None`.
    pub fn detect(body: &Value) -> Option<Self> {
        if !body.is_object() {
            return None;
        }

        if let Ok(oauth) = OAuthErrorBody::deserialize(body) {
            if !oauth.error_description.is_empty() {
                return Some(ErrorPayload::OAuth {
                    description: oauth.error_description,
                });
            }
        }

        match PlatformEnvelope::deserialize(body) {
            Ok(env) if env.error_code != PlatformErrorCode::SUCCESS => Some(ErrorPayload::Platform {
                code: env.error_code,
                status: env.error_status.unwrap_or_default(),
                message: env.message.unwrap_or_default(),
            }),
            _ => None,
        }
    }

    pub fn into_error(self, endpoint: &str) -> PlatformError {
        match self {
            ErrorPayload::Platform {
                code,
                status,
                message,
            } => PlatformError {
                code,
                status,
                message,
                endpoint: endpoint.to_string(),
            },
            ErrorPayload::OAuth { description } => PlatformError {
                code: PlatformErrorCode::DESTINY_UNEXPECTED_ERROR,
                status: description.clone(),
                message: description,
                endpoint: endpoint.to_string(),
            },
        }
    }
}
