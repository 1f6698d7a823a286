use axum::{body::Bytes, extract::State, Json};
use chrono::Utc;
use log::{error, warn};
use serde::Deserialize;
use serde_json::Number;
use std::sync::Arc;

use crate::{
    error::RelayError,
    handlers::parse_json,
    services::{FeedbackRecord, FeedbackSink, RatingRecord},
    types::{FeedbackRequest, StatusAck},
};

/// Thumbs up/down on the latest reply. Acknowledged even when the sink fails;
/// the failure only shows up in the log.
pub async fn feedback_handler(
    State(sink): State<Arc<dyn FeedbackSink>>,
    body: Bytes,
) -> Result<Json<StatusAck>, RelayError> {
    let request: FeedbackRequest = parse_json(&body)?;

    let record = FeedbackRecord {
        message: request.message,
        feedback: request.feedback,
        timestamp: Utc::now(),
    };
    if let Err(e) = sink.record_reaction(record).await {
        warn!("Feedback acknowledged but not stored: {e}");
    }

    Ok(Json(StatusAck::success()))
}

/// Server-side view of a rating body. Any JSON number is accepted here so that
/// out-of-range values get `invalid_rating` rather than a parse failure.
#[derive(Deserialize)]
struct RatingSubmission {
    #[serde(default)]
    rating: Option<Number>,
    #[serde(default)]
    comments: String,
}

fn validate_rating(rating: Option<Number>) -> Result<u8, RelayError> {
    let Some(number) = rating else {
        return Err(RelayError::MissingRating);
    };
    match number.as_u64() {
        Some(0) => Err(RelayError::MissingRating),
        Some(value @ 1..=5) => Ok(value as u8),
        _ => Err(RelayError::InvalidRating(number)),
    }
}

pub async fn rating_handler(
    State(sink): State<Arc<dyn FeedbackSink>>,
    body: Bytes,
) -> Result<Json<StatusAck>, RelayError> {
    let request: RatingSubmission = parse_json(&body)?;
    let rating = validate_rating(request.rating)?;

    sink.record_rating(RatingRecord {
        rating,
        comments: request.comments,
        timestamp: Utc::now(),
    })
    .await
    .map_err(|e| {
        error!("Failed to store rating: {e}");
        RelayError::FeedbackUnavailable
    })?;

    Ok(Json(StatusAck::success()))
}
