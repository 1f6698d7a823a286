use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::persistence::{KeyValueStore, Persisted, StorageError};
use crate::types::{ConversationTurn, FeedbackKind, FeedbackRequest, Role};

pub const HISTORY_KEY: &str = "chatHistory";
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// Called with the updated reply turn and the text just appended to it.
type Observer = Box<dyn FnMut(&ConversationTurn, &str) + Send>;

/// Client-side conversation state.
///
/// History and theme are read from the injected store when the session opens
/// and written back after every change.
pub struct ChatSession<S: KeyValueStore> {
    turns: Vec<ConversationTurn>,
    theme: Theme,
    history_store: Persisted<Vec<ConversationTurn>, S>,
    theme_store: Persisted<Theme, S>,
    observers: Vec<Observer>,
}

fn load_or_default<T, S>(value: &Persisted<T, S>) -> T
where
    T: Serialize + DeserializeOwned + Default,
    S: KeyValueStore,
{
    match value.load() {
        Ok(loaded) => loaded.unwrap_or_default(),
        Err(e) => {
            warn!("Ignoring unreadable {:?}: {e}", value.key());
            T::default()
        }
    }
}

impl<S: KeyValueStore + Clone> ChatSession<S> {
    pub fn open(store: S) -> Self {
        let history_store = Persisted::new(store.clone(), HISTORY_KEY);
        let theme_store = Persisted::new(store, THEME_KEY);

        Self {
            turns: load_or_default(&history_store),
            theme: load_or_default(&theme_store),
            history_store,
            theme_store,
            observers: Vec::new(),
        }
    }
}

impl<S: KeyValueStore> ChatSession<S> {
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Registers a callback that runs after every change to the streaming reply.
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&ConversationTurn, &str) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Adds the user turn and an empty assistant placeholder. Returns the turns to
    /// send upstream (everything but the placeholder), or `None` for blank input.
    pub fn begin_exchange(&mut self, input: &str) -> Option<Vec<ConversationTurn>> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        self.turns.push(ConversationTurn::user(input));
        let request = self.turns.clone();
        self.turns.push(ConversationTurn::placeholder());
        Some(request)
    }

    /// Appends streamed text to the trailing assistant turn and notifies observers.
    /// Empty text is a no-op append but still notifies.
    pub fn append_fragment(&mut self, text: &str) {
        let Some(last) = self.turns.last_mut().filter(|t| t.role == Role::Assistant) else {
            warn!("Dropping {} bytes of reply: no assistant turn to append to", text.len());
            return;
        };
        last.content.push_str(text);

        let last: &ConversationTurn = last;
        for observer in self.observers.iter_mut() {
            observer(last, text);
        }
    }

    pub fn save_history(&self) -> Result<(), StorageError> {
        self.history_store.save(&self.turns)
    }

    /// Appends a standalone assistant turn, e.g. a weather report.
    pub fn push_assistant_note(&mut self, content: impl Into<String>) -> Result<(), StorageError> {
        self.turns.push(ConversationTurn::assistant(content));
        self.save_history()
    }

    /// Feedback is only possible when the latest turn came from the assistant.
    pub fn feedback_request(&self, kind: FeedbackKind) -> Option<FeedbackRequest> {
        self.turns
            .last()
            .filter(|t| t.role == Role::Assistant)
            .map(|t| FeedbackRequest {
                message: t.content.clone(),
                feedback: kind,
            })
    }

    pub fn acknowledge_feedback(&mut self, kind: FeedbackKind) -> Result<(), StorageError> {
        self.push_assistant_note(kind.acknowledgement())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme, StorageError> {
        self.theme = self.theme.toggled();
        self.theme_store.save(&self.theme)?;
        Ok(self.theme)
    }
}

#[cfg(feature = "ssr")]
mod remote {
    use log::info;

    use super::*;
    use crate::client::consumer::{ChatClient, ClientError};
    use crate::client::weather::WeatherClient;

    impl<S: KeyValueStore> ChatSession<S> {
        /// Runs one exchange against the relay. History is saved whether or not the
        /// reply completed; a failed send keeps whatever had streamed so far.
        /// Returns `Ok(None)` for blank input.
        pub async fn send_message(
            &mut self,
            client: &ChatClient,
            input: &str,
        ) -> Result<Option<String>, ClientError> {
            let Some(request) = self.begin_exchange(input) else {
                return Ok(None);
            };
            self.save_history()?;

            let result = client
                .stream_chat(&request, |text| self.append_fragment(text))
                .await;
            self.save_history()?;

            result.map(Some)
        }

        /// Sends feedback on the latest assistant reply and posts the acknowledgement.
        /// Returns `false` when there was no assistant reply to rate.
        pub async fn submit_feedback(
            &mut self,
            client: &ChatClient,
            kind: FeedbackKind,
        ) -> Result<bool, ClientError> {
            let Some(request) = self.feedback_request(kind) else {
                return Ok(false);
            };
            client.send_feedback(&request).await?;
            info!("Feedback sent: {kind:?}");
            self.acknowledge_feedback(kind)?;
            Ok(true)
        }

        pub async fn append_weather(&mut self, weather: &WeatherClient) -> Result<(), ClientError> {
            let report = weather.current_report().await?;
            self.push_assistant_note(report)?;
            Ok(())
        }
    }
}
