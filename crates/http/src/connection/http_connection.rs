use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;

use futures::StreamExt;
use http::header::EXPECT;
use http::{Response, StatusCode};
use http_body::Body;
use http_body_util::Empty;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

use crate::codec::RequestDecoder;
use crate::connection::config::ConnectionConfig;
use crate::connection::lifecycle::{EndReason, LifecycleHooks, Lifetime};
use crate::connection::phase::{ConnectionPhase, PhaseEvent};
use crate::connection::response_writer::ResponseWriter;
use crate::connection::timeout::{TimeoutAction, TimeoutController};
use crate::handler::{Application, Handler, HandlerApp};
use crate::protocol::body::ReqBody;
use crate::protocol::{HttpError, Message, ParseError, RequestFraming, RequestHeader};

/// One HTTP/1.x connection, from first byte to shutdown.
///
/// `HttpConnection` owns the request loop of a single physical connection:
/// it parses request heads off the read half, streams each request body to
/// the application while the application runs, writes and finalizes the
/// response, discards whatever body the application left unread, and decides
/// whether the connection is reused for the next request. Every suspension
/// point (idle wait, head read, application call, drain) runs under the
/// connection's single armed deadline.
///
/// # Type Parameters
///
/// * `R`: the async readable half
/// * `W`: the async writable half
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    writer: ResponseWriter<W>,
    config: ConnectionConfig,
    timeout: TimeoutController,
    phase: ConnectionPhase,
    aborted: bool,
    lifetime: Option<Arc<dyn Lifetime>>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, ConnectionConfig::default())
    }

    pub fn with_config(reader: R, writer: W, config: ConnectionConfig) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            writer: ResponseWriter::with_capacity(writer, 8 * 1024),
            config,
            timeout: TimeoutController::new(),
            phase: ConnectionPhase::default(),
            aborted: false,
            lifetime: None,
        }
    }

    /// Registers the target of the end-of-connection notification, delivered
    /// exactly once when the processing loop exits.
    pub fn with_lifetime(mut self, lifetime: Arc<dyn Lifetime>) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Processes the connection with a plain [`Handler`].
    pub async fn process<H>(self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler + 'static,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        self.serve(HandlerApp::new(handler)).await
    }

    /// Processes the connection, driving `app` once per request until the
    /// connection stops.
    ///
    /// Teardown is unconditional: whichever way the loop exits, the write
    /// half is shut down and the lifetime notification fires exactly once;
    /// failures inside teardown are logged, never propagated.
    pub async fn serve<A>(mut self, app: A) -> Result<(), HttpError>
    where
        A: Application,
        A::RespBody: Body<Data = Bytes> + Unpin,
        <A::RespBody as Body>::Error: Display,
    {
        let result = self.run(&app).await;

        if let Err(e) = self.writer.shutdown().await {
            debug!(cause = %e, "error shutting down write half");
        }

        let reason = if self.aborted || result.is_err() { EndReason::SocketShutdown } else { EndReason::Graceful };
        if let Some(lifetime) = self.lifetime.take() {
            lifetime.end(reason);
        }

        match &result {
            Ok(()) => info!("connection finished"),
            Err(e) => warn!(cause = %e, "connection terminated"),
        }

        result
    }

    async fn run<A>(&mut self, app: &A) -> Result<(), HttpError>
    where
        A: Application,
        A::RespBody: Body<Data = Bytes> + Unpin,
        <A::RespBody as Body>::Error: Display,
    {
        loop {
            // per-request reset; never reached once the connection is
            // stopping, so a fatal error's diagnostic state survives
            self.writer.reset();
            self.phase = ConnectionPhase::AwaitingRequest;

            // leftover pipelined bytes mean a head is already arriving
            let was_idle = self.framed_read.read_buffer().is_empty();
            if was_idle {
                self.timeout.arm(self.config.keep_alive_timeout(), TimeoutAction::CloseConnection);
            } else {
                self.timeout.arm(self.config.header_read_timeout(), TimeoutAction::CloseConnection);
            }

            let next = match self.timeout.bound(self.framed_read.next()).await {
                Ok(next) => next,
                Err(_) => {
                    info!("connection timed out waiting for the next request");
                    return Ok(());
                }
            };

            match next {
                Some(Ok(Message::Header((header, framing)))) => {
                    self.phase = self
                        .phase
                        .step(PhaseEvent::BytesArrived)
                        .step(PhaseEvent::RequestLineParsed)
                        .step(PhaseEvent::HeadersParsed);

                    let keep_alive = self.handle_request(header, framing, app).await?;

                    if self.phase.is_stopping() || !keep_alive {
                        return Ok(());
                    }
                    self.phase = self.phase.step(PhaseEvent::ResponseFinalized);
                }

                // a payload item with no request in flight means framing state
                // desynchronized; never attempt a re-entrant parse
                Some(Ok(Message::Payload(_))) => {
                    error!("received body payload while awaiting a request head");
                    self.phase = self.phase.step(PhaseEvent::ConnectionStopping);
                    self.send_error_response(StatusCode::BAD_REQUEST).await;
                    return Err(ParseError::invalid_body("received body payload while awaiting a request head").into());
                }

                Some(Err(e)) => return self.reject_request(e, was_idle).await,

                None => {
                    debug!("peer closed the connection between requests");
                    return Ok(());
                }
            }
        }
    }

    /// Classifies a read-side failure and leaves the connection stopped.
    async fn reject_request(&mut self, error: ParseError, was_idle: bool) -> Result<(), HttpError> {
        if error.is_peer_reset() {
            if was_idle && self.framed_read.read_buffer().is_empty() {
                // an idle reused connection closed under us: expected churn,
                // not worth a log line
                return Ok(());
            }
            self.aborted = true;
            warn!(cause = %error, "peer reset connection mid-request");
            return Ok(());
        }

        if matches!(error, ParseError::Io { .. }) {
            error!(cause = %error, "transport failure while reading request");
            self.phase = self.phase.step(PhaseEvent::ConnectionStopping);
            return Err(error.into());
        }

        // malformed request: report with the parse phase it was detected in,
        // answer best-effort, close
        let failed_phase = ConnectionPhase::of_parse_error(&error);
        warn!(cause = %error, phase = ?failed_phase, "rejecting malformed request");
        self.phase = failed_phase.step(PhaseEvent::ConnectionStopping);
        self.send_error_response(error.status_code()).await;
        Err(error.into())
    }

    /// Handles one parsed request through the full lifecycle: body channel,
    /// application call, lifecycle hooks, response, drain, context disposal.
    ///
    /// Returns whether the connection may be reused.
    async fn handle_request<A>(&mut self, header: RequestHeader, framing: RequestFraming, app: &A) -> Result<bool, HttpError>
    where
        A: Application,
        A::RespBody: Body<Data = Bytes> + Unpin,
        <A::RespBody as Body>::Error: Display,
    {
        debug!(method = %header.method(), uri = %header.uri(), version = ?header.version(), "request started");

        // interim response for expect: 100-continue, before the body channel
        // exists so the client starts transmitting
        if let Some(value) = header.headers().get(EXPECT) {
            let slice = value.as_bytes();
            if slice.len() >= 4 && &slice[0..4] == b"100-" {
                match self.writer.write_continue().await {
                    Ok(()) => debug!("sent 100 continue interim response"),
                    Err(e) if e.is_peer_reset() => {
                        self.aborted = true;
                        warn!(cause = %e, "peer reset connection before 100 continue");
                        return Ok(false);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let hooks = LifecycleHooks::new();
        let (req_body, mut body_sender) = ReqBody::body_channel(&mut self.framed_read);
        let mut request = header.body(req_body);
        request.extensions_mut().insert(hooks.clone());

        let mut context = app.create_context(request);

        if let Some(request_timeout) = self.config.request_timeout() {
            self.timeout.arm(request_timeout, TimeoutAction::AbortActiveRequest);
        } else {
            self.timeout.disarm();
        }
        let abort_deadline = self.timeout.deadline();

        let mut body_done = false;
        let mut body_failure: Option<ParseError> = None;

        // Drive the application and the body stream concurrently. The
        // application may be waiting for body data while the sender waits to
        // deliver it, so neither side can run to completion first. `biased`
        // gives the application's completion priority; `None` means the armed
        // request deadline fired before the application finished.
        let app_result: Option<Result<Response<A::RespBody>, A::Error>> = {
            tokio::pin! {
                let process_future = app.process(&mut context);
                let body_sender_future = body_sender.send_body();
                let abort_timer = async {
                    match abort_deadline {
                        Some(deadline) => tokio::time::sleep_until(deadline).await,
                        None => std::future::pending::<()>().await,
                    }
                };
            }

            loop {
                select! {
                    biased;

                    response = &mut process_future => break Some(response),

                    result = &mut body_sender_future, if !body_done => {
                        body_done = true;
                        if let Err(e) = result {
                            body_failure = Some(e);
                        }
                    }

                    _ = &mut abort_timer => {
                        warn!("application call exceeded the request timeout, aborting request");
                        break None;
                    }
                }
            }
        };

        self.timeout.disarm();

        // the application error recorded for this request, kept apart from
        // protocol errors; surfaced only through context disposal and the
        // fallback response
        let mut recorded_error: Option<Box<dyn Error + Send + Sync>> = None;
        let mut timed_out = false;

        let response = match app_result {
            Some(Ok(response)) => Some(response),
            Some(Err(e)) => {
                let e = e.into();
                error!(cause = %e, "application failed to handle request");
                recorded_error = Some(e);
                None
            }
            None => {
                timed_out = true;
                recorded_error = Some("request processing timed out".into());
                None
            }
        };

        // lifecycle ordering: on-starting while nothing is flushed and no
        // error recorded, then body delivery stops (the sender future is
        // gone), then on-completed best-effort
        if !self.writer.headers_sent() && recorded_error.is_none() {
            if let Err(e) = hooks.fire_on_starting() {
                error!(cause = %e, "on-starting hook failed");
                recorded_error = Some(e);
            }
        }

        for failure in hooks.fire_on_completed() {
            warn!(cause = %failure, "on-completed hook failed");
            if recorded_error.is_none() {
                recorded_error = Some(failure);
            }
        }

        // a reset while streaming the body marks the request aborted
        if let Some(failure) = &body_failure {
            if failure.is_peer_reset() {
                warn!(cause = %failure, "peer reset connection while streaming request body");
                self.aborted = true;
            }
        }

        // abort checkpoint: the peer is gone, there is no meaningful status
        // to produce; dispose and stop
        if self.aborted {
            app.dispose_context(context, recorded_error.as_deref());
            return Ok(false);
        }

        // a malformed request body is a protocol rejection raised mid-call:
        // fatal to the loop, never kept alive
        if let Some(failure) = body_failure {
            let failed_phase = ConnectionPhase::of_parse_error(&failure);
            warn!(cause = %failure, phase = ?failed_phase, "malformed request body");
            self.phase = self.phase.step(PhaseEvent::ConnectionStopping);
            if !self.writer.headers_sent() {
                if let Err(e) = self.writer.send_response(build_error_response(failure.status_code())).await {
                    debug!(cause = %e, "failed to send error response");
                }
            }
            app.dispose_context(context, Some(&failure as &(dyn Error + Send + Sync)));
            return Err(failure.into());
        }

        let mut keep_alive = framing.keep_alive() && !timed_out;
        if framing.is_upgrade() {
            debug!("request asked for protocol upgrade, request framing ends on this connection");
            keep_alive = false;
        }

        // finalize the response before draining: a client waiting for the
        // final bytes should not sit behind a body discard
        let send_result = match response {
            Some(response) => self.writer.send_response(response).await,
            None => {
                let status = if timed_out { StatusCode::REQUEST_TIMEOUT } else { StatusCode::INTERNAL_SERVER_ERROR };
                self.writer.send_response(build_error_response(status)).await
            }
        };

        if let Err(e) = send_result {
            if e.is_peer_reset() {
                warn!(cause = %e, "peer reset connection while writing response");
                self.aborted = true;
                app.dispose_context(context, recorded_error.as_deref());
                return Ok(false);
            }

            if e.is_contract_violation() {
                error!(cause = %e, "response violated its declared framing");
            } else {
                error!(cause = %e, "failed to write response");
            }
            self.phase = self.phase.step(PhaseEvent::ConnectionStopping);
            app.dispose_context(context, Some(&e as &(dyn Error + Send + Sync)));
            return Err(e.into());
        }

        // discard unread body only when the connection is being reused;
        // a closing connection has nothing to keep aligned
        if keep_alive && !body_sender.is_eof() {
            self.timeout.arm(self.config.drain_timeout(), TimeoutAction::CloseConnection);
            match self.timeout.bound(body_sender.skip_body()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if e.is_peer_reset() {
                        warn!(cause = %e, "peer reset connection while draining request body");
                        self.aborted = true;
                    } else {
                        warn!(cause = %e, "failed to drain unread request body");
                    }
                    keep_alive = false;
                }
                Err(_) => {
                    info!("timed out draining unread request body");
                    keep_alive = false;
                }
            }
            self.timeout.disarm();
        }

        app.dispose_context(context, recorded_error.as_deref());

        debug!(bytes = self.writer.bytes_written(), keep_alive, "request finished");

        Ok(keep_alive)
    }

    /// Best-effort error response; does nothing when a response is already on
    /// the wire, and its own failures are only logged.
    async fn send_error_response(&mut self, status: StatusCode) {
        if self.writer.headers_sent() {
            return;
        }

        if let Err(e) = self.writer.send_response(build_error_response(status)).await {
            debug!(cause = %e, "failed to send error response");
        }
    }
}

fn build_error_response(status_code: StatusCode) -> Response<Empty<Bytes>> {
    let mut response = Response::new(Empty::new());
    *response.status_mut() = status_code;
    response
}
