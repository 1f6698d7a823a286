use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequest,
    },
    Client as OpenAIClient,
};
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use log::debug;
use std::pin::Pin;
use thiserror::Error;

use crate::config::AppConfig;
use crate::types::{ConversationTurn, Role};

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("OpenAI error: {0}")]
    Api(#[from] OpenAIError),

    #[error("stream error: {0}")]
    Stream(String),
}

/// One incremental piece of generated text. Absent content counts as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub content: Option<String>,
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn into_string(self) -> String {
        self.content.unwrap_or_default()
    }
}

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, UpstreamError>> + Send>>;

/// Chat-completion backend that delivers its answer incrementally.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Starts a completion over `turns` (system prompt already included).
    /// Errors returned here happen before any fragment exists.
    async fn stream_completion(
        &self,
        turns: Vec<ConversationTurn>,
    ) -> Result<FragmentStream, UpstreamError>;
}

pub struct OpenAiCompletion {
    client: OpenAIClient<OpenAIConfig>,
    model: String,
}

impl OpenAiCompletion {
    pub fn new(config: &AppConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());
        if let Some(base) = &config.openai_api_base {
            openai_config = openai_config.with_api_base(base.clone());
        }

        Self {
            client: OpenAIClient::with_config(openai_config),
            model: config.model.clone(),
        }
    }

    fn to_request_message(turn: ConversationTurn) -> ChatCompletionRequestMessage {
        match turn.role {
            Role::System => ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: turn.content.into(),
                name: None,
            }),
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: turn.content.into(),
                name: None,
            }),
            #[allow(deprecated)]
            Role::Assistant => ChatCompletionRequestMessage::Assistant(
                async_openai::types::ChatCompletionRequestAssistantMessage {
                    content: Some(turn.content.into()),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                },
            ),
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn stream_completion(
        &self,
        turns: Vec<ConversationTurn>,
    ) -> Result<FragmentStream, UpstreamError> {
        debug!("Requesting streamed completion from {} with {} turns", self.model, turns.len());

        let request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: turns.into_iter().map(Self::to_request_message).collect(),
            stream: Some(true),
            ..Default::default()
        };

        let stream = self.client.chat().create_stream(request).await?;

        Ok(Box::pin(stream.map(|item| {
            item.map(|response| Fragment {
                content: response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content),
            })
            .map_err(UpstreamError::from)
        })))
    }
}
