use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading the `data` of server-sent events from a chunk
/// stream.
///
/// Only the subset OpenAI-compatible servers use is supported: events are
/// separated by blank lines, `data` lines of one event are joined with
/// `\n`, comment lines (`: keep-alive`) and the `event`, `id` and `retry`
/// fields are skipped. CR characters are dropped, so CRLF line endings
/// work as well.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
    eof: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
            eof: false,
        }
    }

    /// Returns the data of the next event, or `None` when the stream ends.
    ///
    /// Trailing bytes that never got terminated by a blank line are
    /// discarded.
    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain complete events in the buffer before reading more.
            while let Some(block) = self.take_block() {
                if let Some(data) = parse_block(&block)? {
                    return Ok(Some(data));
                }
            }

            if self.eof {
                return Ok(None);
            }
            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => {
                    self.buf.extend(bytes.iter().filter(|b| **b != b'\r'));
                }
                None => self.eof = true,
            }
        }
    }

    fn take_block(&mut self) -> Option<Vec<u8>> {
        let eol_idx = self.buf.windows(2).position(|w| w == b"\n\n")?;
        let block = self.buf[..eol_idx].to_vec();
        self.buf.drain(..eol_idx + 2);
        Some(block)
    }
}

// event         = *( comment / field ) end-of-line
// comment       = colon *any-char end-of-line
// field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
fn parse_block(block: &[u8]) -> Result<Option<String>, Error> {
    // Decode the whole block at once, multi-byte characters may have been
    // split across chunks.
    let Ok(block) = str::from_utf8(block) else {
        return Err(Error::InvalidPayload);
    };

    let mut data: Option<String> = None;
    for line in block.split('\n') {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(Error::InvalidPayload);
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match name {
            "data" => {
                let data = data.get_or_insert_default();
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(value);
            }
            "event" | "id" | "retry" => {}
            _ => return Err(Error::InvalidPayload),
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn sse_from(chunks: &[&'static [u8]]) -> Sse {
        Sse::new(Chunks::from_vec_deque(
            chunks.iter().map(|c| Bytes::from_static(*c)).collect(),
        ))
    }

    #[tokio::test]
    async fn test_normal_events() {
        let mut sse = sse_from(&[b"data: hello\n\n", b"data: bye\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quirk_streaming() {
        let mut sse = sse_from(&[b"data:", b" hello\r\n", b"\r", b"\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap(), None);

        // "ü" split between two chunks.
        let mut sse = sse_from(&[b"data: \xc3", b"\xbc\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "ü");
    }

    #[tokio::test]
    async fn test_comments_and_fields() {
        let mut sse = sse_from(&[
            b": keep-alive\n\n",
            b"event: message\nid: 7\ndata: line 1\ndata: line 2\n\n",
            b"data: packed 1\n\ndata: packed 2\n\n",
        ]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "line 1\nline 2");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "packed 1");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "packed 2");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_data() {
        let mut sse = sse_from(&[b"xxxxxx\n\n"]);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);

        let mut sse = sse_from(&[b"data: \xff\n\n"]);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);

        // Unterminated events are dropped.
        let mut sse = sse_from(&[b"data: hello\n", b"data: bye\n"]);
        assert_eq!(sse.next_event().await.unwrap(), None);
    }
}
