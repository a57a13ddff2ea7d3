//! Fixed-size chunking of the input stream.
//!
//! Every chunk is exactly `max_payload` bytes except possibly the last one,
//! regardless of how the underlying reader splits its reads.

use tokio::io::{AsyncRead, AsyncReadExt};

pub struct Chunker<R> {
    reader: R,
    max_payload: usize,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin> Chunker<R> {
    pub fn new(reader: R, max_payload: usize) -> Self {
        Self {
            reader,
            max_payload,
            exhausted: false,
        }
    }

    /// `true` once end-of-input has been observed.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Read the next chunk, or `None` at end of input.
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.max_payload];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                self.exhausted = true;
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }
}
