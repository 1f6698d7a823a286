use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::services::completion::UpstreamError;
use crate::types::ErrorBody;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedRequest {
    #[error("request body is not valid JSON")]
    InvalidJson,

    #[error("request body must be an array of turns")]
    NotAnArray,

    #[error("every turn needs a known role and a string content")]
    InvalidTurn,

    #[error("request body has missing or mistyped fields")]
    InvalidBody,
}

impl MalformedRequest {
    pub fn code(self) -> &'static str {
        match self {
            MalformedRequest::InvalidJson => "invalid_json",
            MalformedRequest::NotAnArray => "not_an_array",
            MalformedRequest::InvalidTurn => "invalid_turn",
            MalformedRequest::InvalidBody => "invalid_body",
        }
    }
}

/// Failures that are turned into a JSON response before any body byte is sent.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    MalformedRequest(#[from] MalformedRequest),

    #[error("upstream completion failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Please provide a rating.")]
    MissingRating,

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(serde_json::Number),

    #[error("Failed to submit feedback. Please try again later.")]
    FeedbackUnavailable,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MalformedRequest(_)
            | RelayError::MissingRating
            | RelayError::InvalidRating(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            RelayError::FeedbackUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RelayError::MalformedRequest(kind) => kind.code(),
            RelayError::Upstream(_) => "upstream_failure",
            RelayError::MissingRating => "missing_rating",
            RelayError::InvalidRating(_) => "invalid_rating",
            RelayError::FeedbackUnavailable => "feedback_unavailable",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::debug!("rejected request: {self}");
        }

        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_malformed_request_response() {
        let response = RelayError::from(MalformedRequest::NotAnArray).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.error, "not_an_array");
    }

    #[test]
    fn test_status_mapping() {
        let upstream = RelayError::Upstream(UpstreamError::Stream("boom".into()));
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.code(), "upstream_failure");
        assert_eq!(RelayError::InvalidRating(9.into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::FeedbackUnavailable.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
