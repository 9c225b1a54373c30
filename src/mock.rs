use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use futures_util::StreamExt as _;
use log::info;

use crate::error::Error;

/// Operator-supplied response shape, immutable for one server run.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub port: u16,
    pub status: u16,
    pub body: String,
    pub content_type: String,
    pub delay: Duration,
}

impl MockConfig {
    /// Defaults matching the CLI: `{"status": "ok"}`, 200, JSON, no delay.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            status: 200,
            body: r#"{"status": "ok"}"#.to_string(),
            content_type: "application/json".to_string(),
            delay: Duration::ZERO,
        }
    }
}

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: String,
    content_type: String,
    delay: Duration,
}

/// Replies to any method on any path with the configured response.
async fn respond(
    req: HttpRequest,
    mut payload: web::Payload,
    response: web::Data<MockResponse>,
) -> HttpResponse {
    // Drain the inbound body fully so clients never stall mid-write.
    while let Some(chunk) = payload.next().await {
        if chunk.is_err() {
            break;
        }
    }

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    info!(
        "{} {} -> {}",
        req.method(),
        req.uri(),
        response.status.as_u16()
    );

    HttpResponse::build(response.status)
        .content_type(response.content_type.clone())
        .body(response.body.clone())
}

pub struct MockServer;

impl MockServer {
    pub fn start(config: MockConfig) -> Result<RunningMock, Error> {
        Self::start_on("0.0.0.0", config)
    }

    pub fn start_on(interface: &str, config: MockConfig) -> Result<RunningMock, Error> {
        let status =
            StatusCode::from_u16(config.status).map_err(|_| Error::InvalidStatus(config.status))?;
        let port = config.port;
        let response = MockResponse {
            status,
            body: config.body,
            content_type: config.content_type,
            delay: config.delay,
        };

        let bound = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(response.clone()))
                .default_service(web::to(respond))
        })
        .bind((interface, port))
        .map_err(|source| Error::Bind { port, source })?;

        let addr = bound.addrs().into_iter().next().ok_or_else(|| Error::Bind {
            port,
            source: io::Error::new(io::ErrorKind::AddrNotAvailable, "no bound address"),
        })?;

        let server = bound.run();
        let handle = server.handle();
        let task = actix_web::rt::spawn(server);

        Ok(RunningMock { addr, handle, task })
    }
}

pub struct RunningMock {
    addr: SocketAddr,
    handle: ServerHandle,
    task: actix_web::rt::task::JoinHandle<io::Result<()>>,
}

impl RunningMock {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Graceful shutdown; in-flight requests (including delayed responses)
    /// are allowed to finish.
    pub async fn stop(self) {
        self.handle.stop(true).await;
        let _ = self.task.await;
    }
}
