use std::env;
use std::fmt;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_SITE_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a customer support assistant for HeadStarter AI, a platform that conducts AI-powered interviews for software engineering jobs. Your goal is to help users with any questions or issues they have regarding the platform, including how to set up an account, how the AI interviews work, what features are available, and any technical difficulties they might encounter. Be polite, clear, and provide concise answers. If a user asks for information beyond your knowledge, direct them to the appropriate resources or escalate the issue if necessary.";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid SITE_ADDR {value:?}: {source}")]
    InvalidAddr {
        value: String,
        #[source]
        source: AddrParseError,
    },
}

#[derive(Clone)]
pub struct AppConfig {
    pub site_addr: SocketAddr,
    pub openai_api_key: String,
    pub openai_api_base: Option<String>,
    pub model: String,
    pub system_prompt: String,
    pub feedback_log_path: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
}

// Hand-written so the credential never ends up in a log line.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("site_addr", &self.site_addr)
            .field("openai_api_key", &"<redacted>")
            .field("openai_api_base", &self.openai_api_base)
            .field("model", &self.model)
            .field("feedback_log_path", &self.feedback_log_path)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

impl AppConfig {
    /// Reads the process environment. Call `dotenv().ok()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let addr = var("SITE_ADDR").unwrap_or_else(|| DEFAULT_SITE_ADDR.to_string());
        let site_addr = addr
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidAddr {
                value: addr.clone(),
                source,
            })?;

        let openai_api_key = var("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        Ok(Self {
            site_addr,
            openai_api_key,
            openai_api_base: var("OPENAI_API_BASE"),
            model: var("CHAT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: var("SYSTEM_PROMPT").unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            feedback_log_path: var("FEEDBACK_LOG_PATH").map(PathBuf::from),
            static_dir: var("STATIC_DIR").map(PathBuf::from),
        })
    }
}
