pub mod chat;
pub mod feedback;

pub use chat::*;
pub use feedback::*;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::MalformedRequest;

/// Two-step decode so "not JSON at all" and "JSON of the wrong shape" get distinct codes.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, MalformedRequest> {
    let value: Value = serde_json::from_slice(body).map_err(|_| MalformedRequest::InvalidJson)?;
    serde_json::from_value(value).map_err(|_| MalformedRequest::InvalidBody)
}
