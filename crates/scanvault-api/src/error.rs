//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>` and convert
//! domain errors with `?` or `.map_err(HttpAppError::from)`, so every failure
//! renders with the same status mapping, body shape and log level.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scanvault_core::{AppError, ErrorMetadata, LogLevel};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether retrying the same request may succeed
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper so `IntoResponse` can be implemented for the core error type.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// A multipart body that exceeds the request limit is reported as 413,
/// anything else the client sent wrong as 400.
impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        let app = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(format!("Request body too large: {}", err.body_text()))
        } else {
            AppError::ValidationFailed(format!("Failed to read multipart: {}", err.body_text()))
        };
        HttpAppError(app)
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

fn error_body(app_error: &AppError, hide_details: bool) -> ErrorResponse {
    let (details, error_type) = if hide_details {
        (None, None)
    } else {
        (
            Some(app_error.detailed_message()),
            Some(app_error.error_type().to_string()),
        )
    };

    ErrorResponse {
        error: app_error.client_message(),
        details,
        error_type,
        code: app_error.error_code().to_string(),
        recoverable: app_error.is_recoverable(),
        suggested_action: app_error.suggested_action().map(String::from),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Production never shows details; elsewhere only non-sensitive errors do.
        let hide_details = is_production_env() || app_error.is_sensitive();
        (status, Json(error_body(app_error, hide_details))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let body = error_body(&AppError::NotFound("document id=abc".to_string()), false);
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["recoverable"], false);
        assert_eq!(json["error_type"], "NotFound");
        assert!(json["details"].as_str().unwrap().contains("abc"));
    }

    #[test]
    fn test_hidden_details_are_omitted() {
        let body = error_body(
            &AppError::BackendUnavailable("scanner: connection refused".to_string()),
            true,
        );
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["error"], "Service unavailable");
        assert!(json.get("details").is_none());
        assert!(json.get("error_type").is_none());
        assert_eq!(json["recoverable"], true);
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::ValidationFailed("empty".into()), StatusCode::BAD_REQUEST),
            (AppError::PayloadTooLarge("big".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (AppError::Timeout("slow".into()), StatusCode::GATEWAY_TIMEOUT),
            (
                AppError::BackendUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(HttpAppError(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_from_anyhow_is_internal() {
        let HttpAppError(err) = anyhow::anyhow!("boom").into();
        assert_eq!(err.error_type(), "Internal");
    }
}
