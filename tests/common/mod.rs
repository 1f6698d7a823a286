#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use supportchat::app::router;
use supportchat::services::{
    CompletionService, FeedbackError, FeedbackRecord, FeedbackSink, Fragment, FragmentStream,
    RatingRecord, UpstreamError,
};
use supportchat::state::AppState;
use supportchat::types::ConversationTurn;

pub const TEST_PROMPT: &str = "You are a test support assistant.";

#[derive(Debug, Clone)]
pub enum Step {
    Fragment(Option<String>),
    Fail(String),
}

pub fn text(s: &str) -> Step {
    Step::Fragment(Some(s.to_string()))
}

/// Upstream stand-in that plays back a fixed list of fragments.
#[derive(Clone, Default)]
pub struct ScriptedCompletion {
    steps: Vec<Step>,
    delay: Option<Duration>,
    reject: Option<String>,
    requests: Arc<Mutex<Vec<Vec<ConversationTurn>>>>,
}

impl ScriptedCompletion {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Default::default()
        }
    }

    /// Fails the call itself, before any fragment exists.
    pub fn rejecting(message: &str) -> Self {
        Self {
            reject: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<Vec<ConversationTurn>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn stream_completion(
        &self,
        turns: Vec<ConversationTurn>,
    ) -> Result<FragmentStream, UpstreamError> {
        self.requests.lock().unwrap().push(turns);
        if let Some(message) = &self.reject {
            return Err(UpstreamError::Stream(message.clone()));
        }

        let delay = self.delay;
        let stream = futures::stream::iter(self.steps.clone()).then(move |step| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match step {
                Step::Fragment(content) => Ok(Fragment { content }),
                Step::Fail(message) => Err(UpstreamError::Stream(message)),
            }
        });
        Ok(Box::pin(stream))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub fail: bool,
    pub reactions: Mutex<Vec<FeedbackRecord>>,
    pub ratings: Mutex<Vec<RatingRecord>>,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl FeedbackSink for RecordingSink {
    async fn record_reaction(&self, record: FeedbackRecord) -> Result<(), FeedbackError> {
        if self.fail {
            return Err(FeedbackError::Io(std::io::Error::other("disk full")));
        }
        self.reactions.lock().unwrap().push(record);
        Ok(())
    }

    async fn record_rating(&self, record: RatingRecord) -> Result<(), FeedbackError> {
        if self.fail {
            return Err(FeedbackError::Io(std::io::Error::other("disk full")));
        }
        self.ratings.lock().unwrap().push(record);
        Ok(())
    }
}

pub fn test_app(completion: ScriptedCompletion, sink: Arc<RecordingSink>) -> Router {
    router(AppState::new(TEST_PROMPT, Arc::new(completion), sink))
}

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
