use futures::stream::{Stream, StreamExt};
use log::debug;
use std::fmt::Display;

use super::decoder::{DecodeError, Utf8StreamDecoder};

/// Reads a streamed reply chunk by chunk and hands each decoded piece to `on_text`.
///
/// `on_text` runs once per transport chunk, also when the chunk decodes to nothing.
/// A transport error is treated as end of stream: the relay aborts the body when
/// the upstream fails, and that is indistinguishable from a finished reply here.
/// Bytes of a character cut off by such an abort are dropped.
/// Returns the assembled text.
pub async fn consume_stream<S, B, E, F>(stream: S, mut on_text: F) -> Result<String, DecodeError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
    F: FnMut(&str),
{
    futures::pin_mut!(stream);

    let mut decoder = Utf8StreamDecoder::new();
    let mut assembled = String::new();
    let mut chunks = 0usize;

    while let Some(item) = stream.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!("Reply stream closed early after {chunks} chunks: {e}");
                if !decoder.pending().is_empty() {
                    debug!("Dropping {} bytes of a cut-off character", decoder.pending().len());
                }
                return Ok(assembled);
            }
        };
        chunks += 1;

        let text = decoder.decode(chunk.as_ref())?;
        assembled.push_str(&text);
        on_text(&text);
    }

    decoder.finish()?;
    debug!("Reply stream ended after {chunks} chunks, {} bytes", assembled.len());
    Ok(assembled)
}
