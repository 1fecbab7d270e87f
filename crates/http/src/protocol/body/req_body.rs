use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;

use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, SinkExt, Stream, StreamExt};

use http_body::{Body, Frame};
use tracing::{debug, error};

use crate::protocol::{Message, ParseError, PayloadItem};

/// The application-facing side of a request body.
///
/// `ReqBody` implements `http_body::Body` and is handed to the application
/// with the request head. It does not own the connection's read half; instead
/// it asks the connection-owned [`ReqBodySender`] for the next payload item
/// through a channel, so the connection task stays the only reader of the
/// transport.
///
/// The pairing matters for protocol correctness: whatever part of the body the
/// application leaves unread is later discarded by the sender's
/// [`ReqBodySender::skip_body`] before the next request's parse, so leftover
/// body bytes are never misread as the next request's head.
pub struct ReqBody {
    signal: mpsc::Sender<oneshot::Sender<PayloadItem>>,
    receiving: Option<oneshot::Receiver<PayloadItem>>,
}

impl ReqBody {
    fn new(signal: mpsc::Sender<oneshot::Sender<PayloadItem>>) -> Self {
        Self { signal, receiving: None }
    }

    /// Creates the body channel pair for one request.
    ///
    /// The returned `ReqBody` goes to the application; the `ReqBodySender`
    /// stays with the connection and serves chunk requests from the framed
    /// payload stream.
    pub fn body_channel<S>(payload_stream: &mut S) -> (ReqBody, ReqBodySender<'_, S>)
    where
        S: Stream + Unpin,
    {
        let (tx, receiver) = mpsc::channel(16);

        let req_body = ReqBody::new(tx);

        let body_sender = ReqBodySender { payload_stream, receiver, eof: false };

        (req_body, body_sender)
    }
}

/// The connection-facing side of a request body.
///
/// Runs concurrently with the application call, pulling framed payload items
/// off the read stream on demand. Tracks whether the body reached its
/// end-of-body marker so the drain step knows whether anything is left.
pub struct ReqBodySender<'conn, S>
where
    S: Stream + Unpin,
{
    payload_stream: &'conn mut S,
    receiver: mpsc::Receiver<oneshot::Sender<PayloadItem>>,
    eof: bool,
}

impl<S, T> ReqBodySender<'_, S>
where
    S: Stream<Item = Result<Message<T>, ParseError>> + Unpin,
{
    /// Serves chunk requests from the application until the body is fully
    /// delivered or a parse error ends it.
    pub async fn send_body(&mut self) -> Result<(), ParseError> {
        loop {
            if self.eof {
                return Ok(());
            }

            if let Some(sender) = self.receiver.next().await {
                match self.payload_stream.next().await {
                    Some(Ok(Message::Payload(payload_item))) => {
                        if payload_item.is_eof() {
                            self.eof = true;
                        }
                        if sender.send(payload_item).is_err() {
                            // the application dropped its body handle mid-read;
                            // remaining bytes are picked up by skip_body
                            debug!("body consumer dropped before receiving chunk");
                        }
                    }

                    Some(Ok(Message::Header(_))) => {
                        error!("received request head while streaming body");
                        return Err(ParseError::invalid_body("received request head while streaming body"));
                    }

                    Some(Err(e)) => {
                        return Err(e);
                    }

                    None => {
                        return Err(ParseError::invalid_body("stream ended before body was complete"));
                    }
                }
            } else {
                // all ReqBody handles are gone; nothing more to serve
                return Ok(());
            }
        }
    }

    /// Consumes and discards whatever the application left unread.
    ///
    /// Must complete (or fail) before the next request's parse begins: a
    /// half-read body left in the stream would be misinterpreted as the next
    /// request's head.
    pub async fn skip_body(&mut self) -> Result<(), ParseError> {
        if self.eof {
            return Ok(());
        }

        let mut skipped: usize = 0;
        loop {
            match self.payload_stream.next().await {
                Some(Ok(Message::Payload(payload_item))) => {
                    if payload_item.is_eof() {
                        self.eof = true;
                        if skipped > 0 {
                            debug!(bytes = skipped, "discarded unread request body");
                        }
                        return Ok(());
                    }

                    if let Some(bytes) = payload_item.as_bytes() {
                        skipped += bytes.len();
                    }
                }

                Some(Ok(Message::Header(_))) => {
                    error!("received request head while draining body");
                    return Err(ParseError::invalid_body("received request head while draining body"));
                }

                Some(Err(e)) => return Err(e),

                None => return Err(ParseError::invalid_body("stream ended while draining body")),
            }
        }
    }

    /// Whether the end-of-body marker has been observed.
    pub fn is_eof(&self) -> bool {
        self.eof
    }
}

impl Body for ReqBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        loop {
            if let Some(oneshot_receiver) = &mut self.receiving {
                return match ready!(oneshot_receiver.poll_unpin(cx)) {
                    Ok(PayloadItem::Chunk(bytes)) => {
                        self.receiving.take();
                        Poll::Ready(Some(Ok(Frame::data(bytes))))
                    }
                    Ok(PayloadItem::Eof) => {
                        self.receiving.take();
                        Poll::Ready(None)
                    }
                    Err(_) => {
                        // sender side gone: body delivery was stopped by the
                        // connection (request finished or aborted)
                        self.receiving.take();
                        Poll::Ready(Some(Err(ParseError::invalid_body("body delivery canceled"))))
                    }
                };
            }

            match ready!(self.signal.poll_ready_unpin(cx)) {
                Ok(()) => {
                    let (tx, rx) = oneshot::channel();
                    match self.signal.start_send(tx) {
                        Ok(()) => {
                            self.receiving = Some(rx);
                            continue;
                        }
                        Err(e) => return Poll::Ready(Some(Err(ParseError::invalid_body(e)))),
                    }
                }
                Err(e) => return Poll::Ready(Some(Err(ParseError::invalid_body(e)))),
            }
        }
    }
}
