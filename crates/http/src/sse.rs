#[cfg(test)]
use std::collections::VecDeque;

use bytes::Bytes;
use reqwest::Response;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ConnectionLost,
    InvalidFrame,
}

/// A reader decoding server-sent events off a streaming response body.
///
/// The agent endpoint only ever sends `data` fields, one per event, so
/// this reader handles exactly that subset of the SSE grammar:
///
/// event       = field end-of-line
/// field       = "data" colon [ space ] *any-char end-of-line
/// end-of-line = lf
///
/// Dropping the reader drops the underlying response, which tears the
/// connection down. This is how streams get aborted.
pub struct Sse {
    buf: String,
    body: Body,
}

// The byte-chunk source, swappable for a scripted one in tests.
enum Body {
    Response(Response),
    #[cfg(test)]
    Scripted(VecDeque<Bytes>),
}

impl Sse {
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Self {
            buf: String::new(),
            body: Body::Response(response),
        }
    }

    #[cfg(test)]
    pub fn from_chunks<I: Into<VecDeque<Bytes>>>(chunks: I) -> Self {
        Self {
            buf: String::new(),
            body: Body::Scripted(chunks.into()),
        }
    }

    /// Returns the payload of the next event, or `None` when the chunk
    /// stream ends.
    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain complete frames before pulling more data.
            if let Some(payload) = self.take_frame()? {
                return Ok(Some(payload));
            }

            let Some(bytes) = self.next_chunk().await? else {
                // End of the chunk stream. A partial frame left in the
                // buffer is dropped here, the caller decides whether
                // the ending was premature.
                return Ok(None);
            };
            let Ok(s) = str::from_utf8(&bytes) else {
                return Err(Error::InvalidFrame);
            };
            self.buf.push_str(s);
        }
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match &mut self.body {
            Body::Response(response) => {
                response.chunk().await.map_err(|_| Error::ConnectionLost)
            }
            #[cfg(test)]
            Body::Scripted(chunks) => Ok(chunks.pop_front()),
        }
    }

    fn take_frame(&mut self) -> Result<Option<String>, Error> {
        // An event ends with a blank line. Frames may span multiple
        // chunks, so an incomplete frame stays buffered.
        let Some(end_idx) = self.buf.find("\n\n") else {
            return Ok(None);
        };

        let frame = &self.buf[..end_idx];
        let Some(payload) = frame.strip_prefix("data:") else {
            return Err(Error::InvalidFrame);
        };
        // A single space after the colon is part of the field syntax,
        // not of the payload.
        let payload = payload.strip_prefix(' ').unwrap_or(payload).to_owned();

        self.buf.drain(..end_idx + 2);

        Ok(Some(payload))
    }
}
