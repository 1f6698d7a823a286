use std::str;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid UTF-8 sequence after {decoded} decoded bytes")]
    InvalidSequence { decoded: usize },

    #[error("stream ended inside a multi-byte character ({pending} bytes pending)")]
    Incomplete { pending: usize },
}

/// Incremental UTF-8 decoder for a chunked byte stream.
///
/// A code point split across two chunks is held back until the rest of its
/// bytes arrive, so every call returns only complete characters.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
    decoded: usize,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of an unfinished character carried over from earlier chunks.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, DecodeError> {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        match str::from_utf8(&bytes) {
            Ok(text) => {
                self.decoded += bytes.len();
                Ok(text.to_owned())
            }
            Err(e) => {
                let valid = e.valid_up_to();
                if e.error_len().is_some() {
                    return Err(DecodeError::InvalidSequence {
                        decoded: self.decoded + valid,
                    });
                }

                // truncated at the end: keep the tail for the next chunk
                self.pending = bytes.split_off(valid);
                self.decoded += valid;
                // `bytes` is now exactly the validated prefix, so nothing gets replaced
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }

    /// Call once the stream has ended.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            let pending = self.pending.len();
            self.pending.clear();
            Err(DecodeError::Incomplete { pending })
        }
    }
}
