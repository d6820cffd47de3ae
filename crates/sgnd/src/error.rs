//! HTTP error taxonomy (spec §7). Every handler failure converts into
//! one of these before crossing the response boundary — no internal
//! error type or message ever reaches the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use sgn_core::ErrorKind;

pub struct ApiError {
    pub kind: ErrorKind,
    pub reason: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind) -> Self {
        ApiError { kind, reason: None }
    }

    pub fn with_reason(kind: ErrorKind, reason: impl Into<String>) -> Self {
        ApiError {
            kind,
            reason: Some(reason.into()),
        }
    }

    fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::InvalidKu
            | ErrorKind::VerifyFailed
            | ErrorKind::InvalidType
            | ErrorKind::MissingCid
            | ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::UntrustedKey => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            ok: false,
            error: self.kind.as_str(),
            reason: self.reason,
        };
        (status, Json(body)).into_response()
    }
}

impl From<sgn_storage::Error> for ApiError {
    fn from(err: sgn_storage::Error) -> Self {
        tracing::error!(error = %err, "storage error");
        ApiError::new(ErrorKind::ServerError)
    }
}

impl From<sgn_outbox::Error> for ApiError {
    fn from(err: sgn_outbox::Error) -> Self {
        tracing::error!(error = %err, "outbox error");
        ApiError::new(ErrorKind::ServerError)
    }
}

impl From<sgn_edges::Error> for ApiError {
    fn from(err: sgn_edges::Error) -> Self {
        tracing::error!(error = %err, "edges error");
        ApiError::new(ErrorKind::ServerError)
    }
}

impl From<sgn_core::Error> for ApiError {
    fn from(_err: sgn_core::Error) -> Self {
        ApiError::new(ErrorKind::InvalidKu)
    }
}
