use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ExplorerError;

/// Standardised API error response body.
///
/// Every error returned by the HTTP layer serialises as:
/// ```json
/// { "ok": false, "error": { "code": "<code>", "message": "<message>" } }
/// ```
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    pub ok: bool,
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorResponse {
                ok: false,
                error: ApiErrorBody {
                    code: code.into(),
                    message: message.into(),
                },
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn missing_parameter(name: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "missing_parameter",
            format!("missing parameter: {name}"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.body.error.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ExplorerError> for ApiError {
    fn from(err: ExplorerError) -> Self {
        let message = err.to_string();
        match err {
            ExplorerError::MissingParameter(name) => Self::missing_parameter(&name),
            ExplorerError::InvalidInput(msg) => Self::bad_request(msg),
            ExplorerError::EmptySearchTerm => {
                Self::new(StatusCode::BAD_REQUEST, "empty_search_term", message)
            }
            ExplorerError::NotFound(msg)
            | ExplorerError::OutOfRange(msg)
            | ExplorerError::ParentNotIndexed(msg) => Self::not_found(msg),
            ExplorerError::DecodeFailure(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "decode_failure", message)
            }
            ExplorerError::BackendUnavailable(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "backend_unavailable", message)
            }
            ExplorerError::Timeout(_) => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "timeout", message)
            }
            ExplorerError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// Rebuilds an [`ExplorerError`] from an error body received over HTTP.
///
/// Out-of-range and unindexed-parent errors share `not_found` on the wire
/// and come back as [`ExplorerError::NotFound`].
pub fn explorer_error_from_body(status: StatusCode, body: &ApiErrorBody) -> ExplorerError {
    let message = body.message.as_str();
    match body.code.as_str() {
        "missing_parameter" => ExplorerError::MissingParameter(
            strip_display_prefix(message, "missing parameter: "),
        ),
        "bad_request" => ExplorerError::InvalidInput(message.to_string()),
        "empty_search_term" => ExplorerError::EmptySearchTerm,
        "not_found" => ExplorerError::NotFound(message.to_string()),
        "decode_failure" => {
            ExplorerError::DecodeFailure(strip_display_prefix(message, "decode failure: "))
        }
        "backend_unavailable" => ExplorerError::BackendUnavailable(strip_display_prefix(
            message,
            "backend unavailable: ",
        )),
        "timeout" => ExplorerError::Timeout(
            message
                .split_whitespace()
                .find_map(|word| word.parse::<u64>().ok())
                .unwrap_or(0),
        ),
        "internal" => ExplorerError::Internal(message.to_string()),
        _ => ExplorerError::BackendUnavailable(format!("{status}: {message}")),
    }
}

fn strip_display_prefix(message: &str, prefix: &str) -> String {
    message.strip_prefix(prefix).unwrap_or(message).to_string()
}
