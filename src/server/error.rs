use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::models::{FailureKind, StreamResult};

pub type AppResult<T> = Result<T, Error>;

/// everything a handler can fail with, each variant maps to one status
///
/// all variants carry plain strings so results can be cloned into StreamResults and logged
/// without holding on to reqwest errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UpstreamUnavailable(String),

    // not really an error, the event is over (or hasn't started) and retrying won't help
    #[error("{0}")]
    OfflineEvent(String),

    #[error("{0}")]
    ExtractionFailed(String),

    #[error("upstream returned {status}")]
    ProxyUpstreamError { status: u16 },

    #[error("internal server error")]
    InternalServerError,

    #[error("{0}")]
    InternalServerErrorWithContext(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) | Error::OfflineEvent(_) => StatusCode::NOT_FOUND,
            Error::UpstreamUnavailable(_) | Error::ExtractionFailed(_) => StatusCode::BAD_GATEWAY,
            // redirects we gave up on make no sense to a player, those become a 502
            Error::ProxyUpstreamError { status } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Error::InternalServerError | Error::InternalServerErrorWithContext(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::NotFound(_) | Error::BadRequest(_) => FailureKind::NotFound,
            Error::OfflineEvent(_) => FailureKind::OfflineEvent,
            Error::ExtractionFailed(_) => FailureKind::ExtractionFailed,
            _ => FailureKind::UpstreamUnavailable,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::UpstreamUnavailable(format!("upstream timed out: {}", err))
        } else {
            Error::UpstreamUnavailable(format!("upstream request failed: {}", err))
        }
    }
}

/// adapters never hand errors upward, they get folded into a failed result here
impl From<Error> for StreamResult {
    fn from(err: Error) -> Self {
        match err {
            Error::OfflineEvent(msg) => StreamResult::offline(msg, None),
            other => StreamResult::failed(other.failure_kind(), other.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("request failed with {}: {}", status, self);
        }

        let mut body = json!({
            "success": false,
            "error": self.to_string(),
        });

        if let Error::OfflineEvent(_) = self {
            body["isLive"] = json!(false);
        }

        (status, Json(body)).into_response()
    }
}
