use std::mem;

use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// One server-sent event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event` field, if the server sent one.
    pub event: Option<String>,
    /// All `data` lines of the event joined by line feeds.
    pub data: String,
}

/// A type for reading server-sent events from a chunk stream.
pub struct Sse {
    buf: String,
    // Bytes of a multi-byte character split across two chunks.
    pending_bytes: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: String::new(),
            pending_bytes: Vec::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<SseEvent>, Error> {
        loop {
            // Drain what is already buffered before touching the stream.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::ChunksError)?
            else {
                // Abort if no more data available, an unterminated trailing
                // event is dropped.
                return Ok(None);
            };
            self.push_bytes(&bytes)?;
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let mut pending = mem::take(&mut self.pending_bytes);
        pending.extend_from_slice(bytes);
        match str::from_utf8(&pending) {
            Ok(s) => self.buf.push_str(s),
            Err(err) if err.error_len().is_none() => {
                // The chunk ends in the middle of a character.
                let valid_up_to = err.valid_up_to();
                let valid = str::from_utf8(&pending[..valid_up_to])
                    .map_err(|_| Error::InvalidPayload)?;
                self.buf.push_str(valid);
                self.pending_bytes = pending[valid_up_to..].to_vec();
            }
            Err(_) => return Err(Error::InvalidPayload),
        }
        Ok(())
    }

    fn try_parse_event(&mut self) -> Result<Option<SseEvent>, Error> {
        // For `end-of-line`, we only handle line feed.
        //
        // event         = *( comment / field ) end-of-line
        // comment       = colon *any-char end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        // end-of-line   = ( cr lf / cr / lf )
        loop {
            let Some(eol_idx) = self.buf.find("\n\n") else {
                return Ok(None);
            };

            let mut event = SseEvent::default();
            let mut has_field = false;
            let mut has_data = false;
            for line in self.buf[0..eol_idx].split('\n') {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let Some((name, value)) = line.split_once(':') else {
                    return Err(Error::InvalidPayload);
                };
                let value = value.strip_prefix(' ').unwrap_or(value);
                match name {
                    "event" => event.event = Some(value.to_owned()),
                    "data" => {
                        if has_data {
                            event.data.push('\n');
                        }
                        event.data.push_str(value);
                        has_data = true;
                    }
                    "id" | "retry" => {}
                    _ => return Err(Error::InvalidPayload),
                }
                has_field = true;
            }

            // Consume the bytes from the buffer.
            self.buf.drain(0..eol_idx + 2);

            // A block of comments only is a keep-alive, skip it.
            if has_field {
                return Ok(Some(event));
            }
        }
    }
}
