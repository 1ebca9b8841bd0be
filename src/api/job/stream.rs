use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::error::PayloadError;
use actix_web::web::{Bytes, BytesMut};
use futures_util::Stream;

use crate::api::job::dto::JobChunk;
use crate::api::job::service::ServiceError;

/// Decodes a raw request payload into submission chunks.
///
/// Framing is one JSON object per newline-terminated line; blank lines
/// are ignored and a trailing line without a newline is still a chunk.
/// Byte-chunk boundaries of the underlying payload carry no meaning.
///
/// The decoder enforces the intake payload limit itself: `PayloadConfig`
/// only guards the built-in body extractors, not a raw `web::Payload`
/// stream. Once more than `limit` bytes have been consumed the stream
/// fails, so neither a long body nor a single huge line can be buffered
/// unbounded.
pub struct ChunkLines<S> {
    payload: S,
    buf: BytesMut,
    limit: usize,
    consumed: usize,
    eof: bool,
}

impl<S> ChunkLines<S> {
    pub fn new(payload: S, limit: usize) -> Self {
        Self {
            payload,
            buf: BytesMut::new(),
            limit,
            consumed: 0,
            eof: false,
        }
    }
}

fn parse_line(line: &[u8]) -> Result<JobChunk, ServiceError> {
    serde_json::from_slice(line).map_err(|e| ServiceError::Malformed(e.to_string()))
}

fn trim_line(line: &[u8]) -> &[u8] {
    let mut line = line;
    while let Some((last, rest)) = line.split_last() {
        if *last == b'\n' || *last == b'\r' {
            line = rest;
        } else {
            break;
        }
    }
    line
}

impl<S> Stream for ChunkLines<S>
where
    S: Stream<Item = Result<Bytes, PayloadError>> + Unpin,
{
    type Item = Result<JobChunk, ServiceError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            // Emit any complete line already buffered.
            if let Some(pos) = this.buf.iter().position(|b| *b == b'\n') {
                let line = this.buf.split_to(pos + 1);
                let line = trim_line(&line);
                if line.is_empty() {
                    continue;
                }
                return Poll::Ready(Some(parse_line(line)));
            }

            if this.eof {
                if this.buf.is_empty() {
                    return Poll::Ready(None);
                }
                let line = this.buf.split_to(this.buf.len());
                let line = trim_line(&line);
                if line.is_empty() {
                    return Poll::Ready(None);
                }
                return Poll::Ready(Some(parse_line(line)));
            }

            match Pin::new(&mut this.payload).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => this.eof = true,
                Poll::Ready(Some(Ok(bytes))) => {
                    this.consumed += bytes.len();
                    if this.consumed > this.limit {
                        this.eof = true;
                        return Poll::Ready(Some(Err(ServiceError::PayloadTooLarge(
                            this.limit,
                        ))));
                    }
                    this.buf.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.eof = true;
                    return Poll::Ready(Some(Err(ServiceError::Transport(e.to_string()))));
                }
            }
        }
    }
}
