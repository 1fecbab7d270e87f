//! The application seam.
//!
//! A connection drives application code through the [`Application`] contract:
//! per request it calls `create_context`, then `process` exactly once, then
//! `dispose_context` exactly once, on every path including failures and
//! aborts. The recorded error handed to `dispose_context` is the request's
//! application error (handler failure, lifecycle hook failure, timeout or
//! response contract violation), kept distinct from protocol errors.
//!
//! Most embeddings don't need the full contract: [`Handler`] is the
//! function-shaped surface (`request in, response out`), [`make_handler`]
//! lifts a plain async function into it, and [`HandlerApp`] adapts any
//! handler into an `Application`.

use std::error::Error;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use http::{Request, Response};
use http_body::Body;
use tracing::debug;

use crate::protocol::body::ReqBody;

/// A request handler: one request in, one response out.
#[async_trait]
pub trait Handler: Send + Sync {
    type RespBody: Body;
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, request: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error>;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<RespBody, Err, F, Fut> Handler for HandlerFn<F>
where
    RespBody: Body,
    F: Fn(Request<ReqBody>) -> Fut + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response<RespBody>, Err>> + Send,
{
    type RespBody = RespBody;
    type Error = Err;

    async fn call(&self, request: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error> {
        (self.f)(request).await
    }
}

/// Lifts an async function into a [`Handler`].
pub fn make_handler<F, RespBody, Err, Ret>(f: F) -> HandlerFn<F>
where
    RespBody: Body,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Ret: Future<Output = Result<Response<RespBody>, Err>>,
    F: Fn(Request<ReqBody>) -> Ret,
{
    HandlerFn { f }
}

/// The per-request invocation contract a connection drives.
///
/// For each request, in order and exactly once each:
///
/// 1. `create_context` receives the request (head, body stream and lifecycle
///    handle in its extensions) and builds whatever per-request state the
///    embedding wants to carry
/// 2. `process` runs the application and yields the response
/// 3. `dispose_context` tears the state down, receiving the error recorded
///    for this request, if any, for diagnostic reporting
#[async_trait]
pub trait Application: Send + Sync {
    type Context: Send;
    type RespBody: Body;
    type Error: Into<Box<dyn Error + Send + Sync>>;

    fn create_context(&self, request: Request<ReqBody>) -> Self::Context;

    async fn process(&self, context: &mut Self::Context) -> Result<Response<Self::RespBody>, Self::Error>;

    fn dispose_context(&self, context: Self::Context, error: Option<&(dyn Error + Send + Sync)>);
}

/// Adapts a [`Handler`] into an [`Application`] whose context is just the
/// request waiting to be consumed.
pub struct HandlerApp<H> {
    handler: Arc<H>,
}

impl<H> HandlerApp<H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<H> Application for HandlerApp<H>
where
    H: Handler + 'static,
{
    type Context = Option<Request<ReqBody>>;
    type RespBody = H::RespBody;
    type Error = Box<dyn Error + Send + Sync>;

    fn create_context(&self, request: Request<ReqBody>) -> Self::Context {
        Some(request)
    }

    async fn process(&self, context: &mut Self::Context) -> Result<Response<Self::RespBody>, Self::Error> {
        match context.take() {
            Some(request) => self.handler.call(request).await.map_err(Into::into),
            None => Err("request context already consumed".into()),
        }
    }

    fn dispose_context(&self, context: Self::Context, error: Option<&(dyn Error + Send + Sync)>) {
        drop(context);
        if let Some(e) = error {
            debug!(cause = %e, "request disposed with recorded error");
        }
    }
}
