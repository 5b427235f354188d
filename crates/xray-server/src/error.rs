use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use xray_abi::{AbiError, ReadError};
use xray_data::ErrorKind;

/// Handler failure rendered as `{"error": "..."}`.
///
/// Only caller-input messages are echoed back; node and analysis failures
/// get a fixed message and are logged instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    NotFound(&'static str),
    BadGateway(&'static str),
    Internal(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(message) => message.as_str(),
            Self::NotFound(message) | Self::BadGateway(message) | Self::Internal(message) => {
                *message
            }
        }
    }
}

impl From<ReadError> for ApiError {
    fn from(err: ReadError) -> Self {
        match err.kind() {
            ErrorKind::InvalidInput => match err {
                ReadError::Abi(AbiError::TypeNotSupported(_) | AbiError::Encode(_)) => {
                    Self::BadRequest(err.to_string())
                }
                // The node's return data, not the request, is at fault here.
                _ => {
                    tracing::warn!(error = %err, "contract result did not decode");
                    Self::BadRequest("could not decode result".to_string())
                }
            },
            ErrorKind::NotFound => Self::NotFound("not found"),
            ErrorKind::NodeRpc => {
                tracing::warn!(error = %err, "node rejected contract call");
                Self::BadGateway("node rejected the call")
            }
            ErrorKind::Upstream => {
                tracing::warn!(error = %err, "node unavailable");
                Self::BadGateway("node unavailable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}
