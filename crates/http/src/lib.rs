//! An asynchronous HTTP/1.x connection engine
//!
//! This crate drives one physical connection from its first byte to shutdown:
//! it repeatedly parses request framing off the byte stream, dispatches to
//! application code, produces a correctly terminated response, and decides
//! whether the connection is reused for the next request. It is the
//! per-connection core of an HTTP/1.x server; accepting sockets, pooling and
//! TLS live in the embedding.
//!
//! # Features
//!
//! - Full HTTP/1.0 and HTTP/1.1 request framing: content-length, chunked,
//!   close-delimited and empty bodies
//! - Streaming request and response bodies over `http_body::Body`
//! - Keep-alive and pipelining, with unread bodies drained so framing stays
//!   aligned across requests
//! - Per-phase deadlines through a single armed timeout (idle wait, header
//!   read, application call, drain)
//! - Phase-tagged rejection of malformed input and a strict separation of
//!   protocol errors from application errors
//! - Response contract enforcement: a declared `Content-Length` that
//!   disagrees with the bytes actually written fails loudly
//! - Expect-continue, upgrade detection, per-request lifecycle hooks and an
//!   exactly-once end-of-connection notification
//!
//! # Example
//!
//! ```no_run
//! use http::{Request, Response, StatusCode};
//! use std::error::Error;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn, Level};
//! use tracing_subscriber::FmtSubscriber;
//! use slim_http::connection::HttpConnection;
//! use slim_http::handler::make_handler;
//! use slim_http::protocol::body::ReqBody;
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder()
//!         .with_max_level(Level::INFO)
//!         .finish();
//!     tracing::subscriber::set_global_default(subscriber)
//!         .expect("setting default subscriber failed");
//!
//!     info!(port = 8080, "start listening");
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer);
//!             match connection.process(handler).await {
//!                 Ok(()) => info!("finished process, connection shutdown"),
//!                 Err(e) => error!("service has error, cause {}, connection shutdown", e),
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request<ReqBody>) -> Result<Response<String>, Box<dyn Error + Send + Sync>> {
//!     info!("request path {}", request.uri().path());
//!
//!     let response_body = "Hello World!\r\n";
//!     let response = Response::builder()
//!         .status(StatusCode::OK)
//!         .header(http::header::CONTENT_LENGTH, response_body.len())
//!         .body(response_body.to_string())
//!         .unwrap();
//!
//!     Ok(response)
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: the per-connection request loop and its state machine,
//!   deadlines, response writer and lifecycle seams
//! - [`protocol`]: message, framing and error vocabulary, streaming bodies
//! - [`codec`]: wire-level encoding/decoding over `tokio_util::codec`
//! - [`handler`]: the application contract
//!
//! # Limitations
//!
//! - HTTP/1.x only; HTTP/2 and HTTP/3 are negotiated elsewhere
//! - No TLS (terminate it in front of the engine)
//! - Maximum head size: 8KB, maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
