use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{
    CompletionService, FeedbackSink, JsonlFeedbackSink, LogFeedbackSink, OpenAiCompletion,
};

/// Process-wide handles shared by every request. Nothing in here is mutated per request.
#[derive(FromRef, Clone)]
pub struct AppState {
    pub system_prompt: Arc<str>,
    pub completion: Arc<dyn CompletionService>,
    pub feedback: Arc<dyn FeedbackSink>,
}

impl AppState {
    pub fn new(
        system_prompt: impl Into<Arc<str>>,
        completion: Arc<dyn CompletionService>,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            completion,
            feedback,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let feedback: Arc<dyn FeedbackSink> = match &config.feedback_log_path {
            Some(path) => Arc::new(JsonlFeedbackSink::new(path.clone())),
            None => Arc::new(LogFeedbackSink),
        };

        Self::new(
            config.system_prompt.as_str(),
            Arc::new(OpenAiCompletion::new(config)),
            feedback,
        )
    }
}
