use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::Utc;
use futures_util::StreamExt as _;
use log::{info, warn};
use tokio::sync::Mutex;

use crate::error::Error;
use crate::records::{BodyPreview, RequestRecord};

const JSON_PREVIEW_LIMIT: usize = 500;
const RAW_PREVIEW_LIMIT: usize = 200;

/// Append-only capture history. One log per server instance; cloning the
/// handle shares the same underlying records.
#[derive(Clone, Default)]
pub struct CaptureLog {
    records: Arc<Mutex<Vec<RequestRecord>>>,
}

impl CaptureLog {
    /// Appends happen in body-completion order: the mutex makes each append
    /// atomic, so concurrent connections never interleave or drop records.
    pub async fn append(&self, record: RequestRecord) {
        self.records.lock().await.push(record);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Prefix-consistent copy of the log, safe to take while serving.
    pub async fn snapshot(&self) -> Vec<RequestRecord> {
        self.records.lock().await.clone()
    }
}

/// Handles any method on any path: drains the body, appends one record and
/// acknowledges with a fixed JSON response.
pub async fn capture(
    req: HttpRequest,
    mut payload: web::Payload,
    log: web::Data<CaptureLog>,
) -> HttpResponse {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        match chunk {
            Ok(bytes) => body.extend_from_slice(&bytes),
            Err(err) => {
                // Client went away mid-body; keep what was read.
                warn!("body read interrupted, capturing partial request: {err}");
                break;
            }
        }
    }

    let headers = req
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let record = RequestRecord {
        timestamp: Utc::now(),
        method: req.method().to_string(),
        path: req.uri().to_string(),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    info!(
        "{} {} | headers: {} | body: {} bytes",
        record.method,
        record.path,
        record.headers.len(),
        record.body.len()
    );
    match record.body_preview() {
        BodyPreview::Json(value) => {
            let pretty = serde_json::to_string_pretty(&value).unwrap_or_default();
            info!("{}", truncated(&pretty, JSON_PREVIEW_LIMIT));
        }
        BodyPreview::Raw(text) => info!("{}", truncated(&text, RAW_PREVIEW_LIMIT)),
        BodyPreview::Empty => {}
    }

    let ack = serde_json::json!({
        "status": "received",
        "timestamp": record.timestamp,
    });

    log.append(record).await;

    HttpResponse::Ok().json(ack)
}

fn truncated(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

pub struct CaptureServer;

impl CaptureServer {
    /// Binds `0.0.0.0:port` and starts serving. Fails fast if the port is
    /// taken or privileged.
    pub fn start(port: u16) -> Result<RunningCapture, Error> {
        Self::start_on(("0.0.0.0", port))
    }

    /// Same as [`start`](Self::start) with an explicit interface; port 0
    /// picks a free one, the chosen address is on the returned handle.
    pub fn start_on(addr: (&str, u16)) -> Result<RunningCapture, Error> {
        let port = addr.1;
        let log = CaptureLog::default();
        let handler_log = log.clone();

        let bound = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(handler_log.clone()))
                .default_service(web::to(capture))
        })
        .bind(addr)
        .map_err(|source| Error::Bind { port, source })?;

        let addr = bound.addrs().into_iter().next().ok_or_else(|| Error::Bind {
            port,
            source: io::Error::new(io::ErrorKind::AddrNotAvailable, "no bound address"),
        })?;

        let server = bound.run();
        let handle = server.handle();
        let task = actix_web::rt::spawn(server);

        Ok(RunningCapture {
            addr,
            log,
            handle,
            task,
        })
    }
}

/// A live capture server. Dropping it without calling [`stop`] leaves the
/// server running for the rest of the process.
pub struct RunningCapture {
    addr: SocketAddr,
    log: CaptureLog,
    handle: ServerHandle,
    task: actix_web::rt::task::JoinHandle<io::Result<()>>,
}

impl RunningCapture {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn log(&self) -> CaptureLog {
        self.log.clone()
    }

    /// Graceful shutdown: stops accepting, lets in-flight requests finish,
    /// then returns the final capture history.
    pub async fn stop(self) -> Vec<RequestRecord> {
        self.handle.stop(true).await;
        let _ = self.task.await;
        self.log.snapshot().await
    }
}
