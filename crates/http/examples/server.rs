use async_trait::async_trait;
use http::{Request, Response, StatusCode};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use slim_http::connection::{ConnectionConfig, EndReason, HttpConnection};
use slim_http::handler::Handler;
use slim_http::protocol::body::ReqBody;
use tokio::net::TcpListener;

use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!(port = 8080, "start listening");
    let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
        Ok(tcp_listener) => tcp_listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    let config = ConnectionConfig::new()
        .with_keep_alive_timeout(Duration::from_secs(30))
        .with_request_timeout(Duration::from_secs(10));

    let handler = Arc::new(SimpleHandler);
    let lifetime = Arc::new(|reason: EndReason| info!(?reason, "connection ended"));

    loop {
        let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let handler = handler.clone();
        let config = config.clone();
        let lifetime = lifetime.clone();

        tokio::spawn(async move {
            info!(%remote_addr, "accepted connection");
            let (reader, writer) = tcp_stream.into_split();
            let connection = HttpConnection::with_config(reader, writer, config).with_lifetime(lifetime);
            if let Err(e) = connection.process(handler).await {
                error!(cause = %e, "connection shut down with error");
            }
        });
    }
}

struct SimpleHandler;

#[async_trait]
impl Handler for SimpleHandler {
    type RespBody = String;
    type Error = Box<dyn Error + Send + Sync>;

    async fn call(&self, request: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error> {
        let path = request.uri().path().to_string();
        info!(path, "handling request");

        let body = "Hello World!\r\n";

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(http::header::CONTENT_LENGTH, body.len())
            .body(body.to_string())
            .unwrap();

        Ok(response)
    }
}
