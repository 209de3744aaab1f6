//! API error mapping.
//!
//! Engine domain errors map to 409 Conflict with a machine-readable
//! `errorType` and the request's trace id; everything else is a 500. Both
//! shapes carry the trace id so callers can correlate with logs.

use askflow_core::FlowError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    /// A domain error from the engine.
    pub fn flow(err: FlowError, trace_id: String) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            body: ErrorBody {
                error_type: err.kind().to_string(),
                message: err.to_string(),
                trace_id: Some(trace_id),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                error_type: "NotFound".to_string(),
                message: message.into(),
                trace_id: None,
            },
        }
    }

    pub fn internal(message: impl Into<String>, trace_id: Option<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                error_type: "Internal".to_string(),
                message: message.into(),
                trace_id,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
