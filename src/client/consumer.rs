use log::{debug, warn};
use reqwest::Client;
use thiserror::Error;

use super::decoder::DecodeError;
use super::persistence::StorageError;
use super::stream::consume_stream;
use super::weather::WeatherError;
use crate::types::{ConversationTurn, ErrorBody, FeedbackRequest, RatingRequest, StatusAck};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected the request ({status}): {error}")]
    Rejected { status: u16, error: String },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),
}

/// HTTP side of the chat widget: talks to the relay server.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Posts `turns` to `/chat` and feeds the reply to `on_text` as it streams in.
    /// A non-success status is returned as [`ClientError::Rejected`] without reading
    /// the body as reply text.
    pub async fn stream_chat<F>(
        &self,
        turns: &[ConversationTurn],
        on_text: F,
    ) -> Result<String, ClientError>
    where
        F: FnMut(&str),
    {
        debug!("Sending {} turns to {}/chat", turns.len(), self.base_url);

        let response = self
            .http
            .post(format!("{}/chat", self.base_url))
            .json(turns)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(response).await);
        }

        Ok(consume_stream(response.bytes_stream(), on_text).await?)
    }

    pub async fn send_feedback(&self, request: &FeedbackRequest) -> Result<StatusAck, ClientError> {
        self.post_json("feedback", request).await
    }

    pub async fn send_rating(&self, request: &RatingRequest) -> Result<StatusAck, ClientError> {
        self.post_json("feedback/rating", request).await
    }

    async fn post_json<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<StatusAck, ClientError> {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Ok(response.json().await?)
    }
}

async fn rejection(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let error = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(e) => {
            warn!("Error response without a JSON body: {e}");
            "unknown".to_string()
        }
    };
    ClientError::Rejected { status, error }
}
