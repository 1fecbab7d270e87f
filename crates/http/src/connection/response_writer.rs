//! The buffered response writer.
//!
//! Owns the connection's write half and the response encoder, and enforces
//! the response-state invariants for one request at a time:
//!
//! - the head is frozen once flushed (`headers_sent`)
//! - `write` counts every byte before enforcement, so a declared-length
//!   violation reports the true written count instead of silently dropping
//!   the excess
//! - `finalize` is idempotent, implicitly starts a head-only response, emits
//!   the body's terminal framing, and hard-faults when the declared
//!   Content-Length and the bytes actually written disagree
//!
//! `reset` re-arms the writer for the next request on a reused connection.

use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use http::{Response, header};
use http_body::Body;
use http_body_util::BodyExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;

use crate::codec::ResponseEncoder;
use crate::protocol::{Message, PayloadItem, PayloadSize, ResponseHead, SendError};

#[derive(Debug)]
pub struct ResponseWriter<W> {
    writer: W,
    buffer: BytesMut,
    encoder: ResponseEncoder,
    pending_head: Option<(ResponseHead, PayloadSize)>,
    headers_sent: bool,
    finalized: bool,
    declared_length: Option<u64>,
    bytes_written: u64,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn with_capacity(writer: W, buffer_size: usize) -> Self {
        Self {
            writer,
            buffer: BytesMut::with_capacity(buffer_size),
            encoder: ResponseEncoder::new(),
            pending_head: None,
            headers_sent: false,
            finalized: false,
            declared_length: None,
            bytes_written: 0,
        }
    }

    /// Re-arms the writer for the next request on a reused connection.
    pub fn reset(&mut self) {
        self.pending_head = None;
        self.headers_sent = false;
        self.finalized = false;
        self.declared_length = None;
        self.bytes_written = 0;
    }

    #[inline]
    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Stages the response head. Only legal while nothing has been flushed.
    pub fn set_head(&mut self, head: ResponseHead, payload_size: PayloadSize) -> Result<(), SendError> {
        if self.headers_sent {
            return Err(SendError::HeadersSent);
        }

        self.declared_length = match payload_size {
            PayloadSize::Length(n) => Some(n),
            PayloadSize::Empty => Some(0),
            PayloadSize::Chunked | PayloadSize::Close => None,
        };
        self.pending_head = Some((head, payload_size));
        Ok(())
    }

    /// Flushes the staged status line and headers. Idempotent: the second and
    /// later calls are no-ops, so "finalize before drain" ordering can call
    /// it without tracking whether the response already started.
    pub async fn start(&mut self) -> Result<(), SendError> {
        if self.headers_sent {
            return Ok(());
        }

        let (head, payload_size) =
            self.pending_head.take().ok_or_else(|| SendError::invalid_body("no response head staged"))?;

        self.encoder.encode(Message::<_, Bytes>::Header((head, payload_size)), &mut self.buffer)?;
        self.headers_sent = true;
        self.flush_buffer().await
    }

    /// Streams one chunk of body data, starting the response if necessary.
    ///
    /// The chunk is counted against `bytes_written` before the declared-length
    /// check so a violation reports what the application actually produced;
    /// nothing is silently truncated.
    pub async fn write(&mut self, bytes: Bytes) -> Result<(), SendError> {
        if self.finalized {
            return Err(SendError::invalid_body("response already finalized"));
        }

        self.start().await?;

        if bytes.is_empty() {
            return Ok(());
        }

        self.bytes_written += bytes.len() as u64;
        if let Some(declared) = self.declared_length {
            if self.bytes_written > declared {
                return Err(SendError::PayloadTooLong { declared, written: self.bytes_written });
            }
        }

        self.encoder.encode(Message::<(ResponseHead, PayloadSize), _>::Payload(PayloadItem::Chunk(bytes)), &mut self.buffer)?;
        self.flush_buffer().await
    }

    /// Ends the response exactly once.
    ///
    /// Starts implicitly so a response with no body still emits its head,
    /// writes the terminal framing (last-chunk marker for chunked bodies) and
    /// flushes. When a Content-Length was declared but the written byte count
    /// disagrees, the terminal framing still goes out and the mismatch is
    /// raised as a hard fault: the response on the wire is wrong and silently
    /// patching the count would hide the application bug.
    pub async fn finalize(&mut self) -> Result<(), SendError> {
        if self.finalized {
            return Ok(());
        }

        self.start().await?;
        self.finalized = true;

        self.encoder.encode(Message::<(ResponseHead, PayloadSize), Bytes>::Payload(PayloadItem::Eof), &mut self.buffer)?;
        self.flush_buffer().await?;

        if let Some(declared) = self.declared_length {
            if declared != self.bytes_written {
                return Err(SendError::ContentLengthMismatch { declared, written: self.bytes_written });
            }
        }

        Ok(())
    }

    /// Writes a complete response: head, streamed body, finalization.
    ///
    /// An explicit `Content-Length` header on the response is taken as the
    /// application's declared length and enforced against the body actually
    /// produced; without one the body's size hint picks between fixed-length
    /// and chunked framing.
    pub async fn send_response<B>(&mut self, response: Response<B>) -> Result<(), SendError>
    where
        B: Body<Data = Bytes> + Unpin,
        B::Error: Display,
    {
        let (parts, mut body) = response.into_parts();

        let declared = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        let payload_size = match declared {
            Some(0) => PayloadSize::new_empty(),
            Some(n) => PayloadSize::new_length(n),
            None => match body.size_hint().exact() {
                Some(0) => PayloadSize::new_empty(),
                Some(n) => PayloadSize::new_length(n),
                None => PayloadSize::new_chunked(),
            },
        };

        self.set_head(ResponseHead::from_parts(parts, ()), payload_size)?;
        self.start().await?;

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    let bytes =
                        frame.into_data().map_err(|_| SendError::invalid_body("unexpected non-data frame in response body"))?;
                    self.write(bytes).await?;
                }
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}"))),
                None => break,
            }
        }

        self.finalize().await
    }

    /// Writes the `100 Continue` interim response, bypassing the encoder:
    /// interim responses carry no framing and do not affect response state.
    pub async fn write_continue(&mut self) -> Result<(), SendError> {
        if self.headers_sent {
            return Err(SendError::HeadersSent);
        }
        self.writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Shuts down the write half on connection teardown.
    pub async fn shutdown(&mut self) -> Result<(), SendError> {
        self.flush_buffer().await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    async fn flush_buffer(&mut self) -> Result<(), SendError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.writer.write_all(self.buffer.as_ref()).await?;
        self.buffer.clear();
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Response, StatusCode};
    use http_body_util::{Empty, Full};
    use tokio::io::{AsyncReadExt, duplex};

    async fn collect(mut read_half: tokio::io::DuplexStream) -> String {
        let mut out = Vec::new();
        read_half.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    fn writer() -> (ResponseWriter<tokio::io::DuplexStream>, tokio::io::DuplexStream) {
        let (near, far) = duplex(64 * 1024);
        (ResponseWriter::with_capacity(near, 8 * 1024), far)
    }

    fn head(status: StatusCode) -> ResponseHead {
        Response::builder().status(status).body(()).unwrap()
    }

    #[tokio::test]
    async fn head_only_response() {
        let (mut writer, far) = writer();

        writer.set_head(head(StatusCode::OK), PayloadSize::new_empty()).unwrap();
        writer.finalize().await.unwrap();
        writer.shutdown().await.unwrap();

        let wire = collect(far).await;
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.contains("content-length: 0\r\n"));
    }

    #[tokio::test]
    async fn finalize_is_idempotent() {
        let (mut writer, far) = writer();

        writer.set_head(head(StatusCode::OK), PayloadSize::new_length(2)).unwrap();
        writer.write(Bytes::from_static(b"ok")).await.unwrap();
        writer.finalize().await.unwrap();
        writer.finalize().await.unwrap();
        writer.shutdown().await.unwrap();

        let wire = collect(far).await;
        // exactly one response on the wire
        assert_eq!(wire.matches("HTTP/1.1 200 OK").count(), 1);
        assert!(wire.ends_with("\r\n\r\nok"));
    }

    #[tokio::test]
    async fn head_is_frozen_once_sent() {
        let (mut writer, _far) = writer();

        writer.set_head(head(StatusCode::OK), PayloadSize::new_empty()).unwrap();
        writer.start().await.unwrap();

        let result = writer.set_head(head(StatusCode::NOT_FOUND), PayloadSize::new_empty());
        assert!(matches!(result, Err(SendError::HeadersSent)));
    }

    #[tokio::test]
    async fn overlong_body_counts_before_failing() {
        let (mut writer, _far) = writer();

        writer.set_head(head(StatusCode::OK), PayloadSize::new_length(10)).unwrap();
        writer.write(Bytes::from_static(b"hello ")).await.unwrap();

        let result = writer.write(Bytes::from_static(b"world!")).await;
        match result {
            Err(SendError::PayloadTooLong { declared, written }) => {
                assert_eq!(declared, 10);
                // the full 12 bytes count, nothing silently dropped
                assert_eq!(written, 12);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn short_body_faults_at_finalize() {
        let (mut writer, _far) = writer();

        writer.set_head(head(StatusCode::OK), PayloadSize::new_length(10)).unwrap();
        writer.write(Bytes::from_static(b"hello")).await.unwrap();

        let result = writer.finalize().await;
        assert!(matches!(result, Err(SendError::ContentLengthMismatch { declared: 10, written: 5 })));
    }

    #[tokio::test]
    async fn chunked_body_ends_with_last_chunk_marker() {
        let (mut writer, far) = writer();

        writer.set_head(head(StatusCode::OK), PayloadSize::new_chunked()).unwrap();
        writer.write(Bytes::from_static(b"hello")).await.unwrap();
        writer.finalize().await.unwrap();
        writer.shutdown().await.unwrap();

        let wire = collect(far).await;
        assert!(wire.contains("transfer-encoding: chunked\r\n"));
        assert!(wire.ends_with("5\r\nhello\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn send_response_honors_declared_content_length() {
        let (mut writer, _far) = writer();

        // the application claims 10 but produces 12
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, 10)
            .body(Full::new(Bytes::from_static(b"hello world!")))
            .unwrap();

        let result = writer.send_response(response).await;
        assert!(matches!(result, Err(SendError::PayloadTooLong { declared: 10, written: 12 })));
    }

    #[tokio::test]
    async fn send_response_streams_full_body() {
        let (mut writer, far) = writer();

        let response = Response::builder().status(StatusCode::OK).body(Full::new(Bytes::from_static(b"hi"))).unwrap();
        writer.send_response(response).await.unwrap();
        writer.shutdown().await.unwrap();

        let wire = collect(far).await;
        assert!(wire.contains("content-length: 2\r\n"));
        assert!(wire.ends_with("\r\n\r\nhi"));
    }

    #[tokio::test]
    async fn empty_response_body() {
        let (mut writer, far) = writer();

        let response = Response::builder().status(StatusCode::NO_CONTENT).body(Empty::<Bytes>::new()).unwrap();
        writer.send_response(response).await.unwrap();
        writer.shutdown().await.unwrap();

        let wire = collect(far).await;
        assert!(wire.starts_with("HTTP/1.1 204 No Content\r\n"));
    }

    #[tokio::test]
    async fn continue_is_rejected_after_start() {
        let (mut writer, _far) = writer();

        writer.set_head(head(StatusCode::OK), PayloadSize::new_empty()).unwrap();
        writer.start().await.unwrap();

        assert!(matches!(writer.write_continue().await, Err(SendError::HeadersSent)));
    }
}
