//! Consumer side of the chat widget: reading the streamed reply, holding the
//! conversation, and persisting it between runs.

pub mod decoder;
pub mod persistence;
pub mod session;
pub mod stream;

#[cfg(feature = "ssr")]
pub mod consumer;
#[cfg(feature = "ssr")]
pub mod weather;

pub use decoder::{DecodeError, Utf8StreamDecoder};
pub use persistence::{FileStore, KeyValueStore, MemoryStore, Persisted, StorageError};
pub use session::{ChatSession, Theme, HISTORY_KEY, THEME_KEY};
pub use stream::consume_stream;

#[cfg(feature = "hydrate")]
pub use persistence::BrowserStore;

#[cfg(feature = "ssr")]
pub use consumer::{ChatClient, ClientError};
#[cfg(feature = "ssr")]
pub use weather::{WeatherClient, WeatherError};
