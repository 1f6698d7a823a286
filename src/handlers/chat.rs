use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use futures::stream::{self, Stream, StreamExt};
use log::{debug, error, info};
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::{
    error::{MalformedRequest, RelayError},
    services::{FragmentStream, UpstreamError},
    state::AppState,
    types::ConversationTurn,
};

/// Fragments that may sit between the upstream pump and the socket.
const RELAY_BUFFER: usize = 32;

pub const STREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Response body of one relay session: the receiving half of the pump channel.
pub struct FragmentBody {
    receiver: mpsc::Receiver<Result<Bytes, UpstreamError>>,
}

impl Stream for FragmentBody {
    type Item = Result<Bytes, UpstreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Decodes the request body into the ordered turn list.
pub fn parse_turns(body: &[u8]) -> Result<Vec<ConversationTurn>, MalformedRequest> {
    let value: Value = serde_json::from_slice(body).map_err(|_| MalformedRequest::InvalidJson)?;

    let Value::Array(items) = value else {
        return Err(MalformedRequest::NotAnArray);
    };

    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|_| MalformedRequest::InvalidTurn))
        .collect()
}

pub async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, RelayError> {
    let history = parse_turns(&body)?;

    info!("Starting relay session with {} turns", history.len());

    let mut turns = Vec::with_capacity(history.len() + 1);
    turns.push(ConversationTurn::system(state.system_prompt.as_ref()));
    turns.extend(history);

    let mut upstream = state.completion.stream_completion(turns).await?;

    // The upstream request goes out on first poll. Wait for the first real
    // fragment so refusals and connection errors still get a status code.
    let first = loop {
        match upstream.next().await {
            Some(Ok(fragment)) if fragment.as_str().is_empty() => continue,
            Some(Ok(fragment)) => break Some(fragment),
            Some(Err(e)) => return Err(e.into()),
            None => break None,
        }
    };
    let upstream: FragmentStream = Box::pin(stream::iter(first.map(Ok)).chain(upstream));

    let (tx, rx) = mpsc::channel(RELAY_BUFFER);
    tokio::spawn(pump_fragments(upstream, tx));

    Ok((
        [
            (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(FragmentBody { receiver: rx }),
    )
        .into_response())
}

/// Forwards upstream fragments in arrival order until the upstream ends, fails,
/// or the client goes away.
async fn pump_fragments(
    mut upstream: FragmentStream,
    tx: mpsc::Sender<Result<Bytes, UpstreamError>>,
) {
    let mut fragments = 0usize;
    let mut bytes = 0usize;

    while let Some(item) = upstream.next().await {
        match item {
            Ok(fragment) => {
                let text = fragment.into_string();
                if text.is_empty() {
                    continue;
                }
                if fragments == 0 {
                    debug!("First fragment received from upstream");
                }

                let len = text.len();
                if tx.send(Ok(Bytes::from(text))).await.is_err() {
                    debug!("Client went away after {fragments} fragments");
                    return;
                }
                fragments += 1;
                bytes += len;
            }
            Err(e) => {
                error!("Upstream failed after {fragments} fragments: {e}");
                // the body yields this error, which aborts the response
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }

    info!("Relay session finished: {fragments} fragments, {bytes} bytes");
}
