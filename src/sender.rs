use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{info, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};

use crate::error::Error;

/// Upper bound on a single attempt; no attempt blocks past this.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// One outbound request description.
#[derive(Debug, Clone)]
pub struct SendSpec {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    /// JSON body; when unset a synthetic marker payload is sent so captures
    /// are self-describing.
    pub body: Option<serde_json::Value>,
    pub repeat: u32,
    pub delay: Duration,
}

impl SendSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "POST".to_string(),
            headers: Vec::new(),
            body: None,
            repeat: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Outcome of a single repetition.
#[derive(Debug)]
pub struct Attempt {
    pub outcome: Outcome,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub enum Outcome {
    Status(u16),
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Status(code) if *code < 400)
    }
}

pub fn default_body() -> serde_json::Value {
    serde_json::json!({ "test": true, "timestamp": Utc::now() })
}

pub fn client() -> Result<Client, Error> {
    Ok(Client::builder().timeout(ATTEMPT_TIMEOUT).build()?)
}

/// Executes `spec.repeat` attempts in order, sleeping `spec.delay` strictly
/// between attempts. A transport failure is that attempt's outcome and never
/// aborts the remaining repetitions.
pub async fn send(client: &Client, spec: &SendSpec) -> Result<Vec<Attempt>, Error> {
    let method = Method::from_str(&spec.method.to_uppercase())
        .map_err(|_| Error::InvalidMethod(spec.method.clone()))?;
    let body = spec.body.clone().unwrap_or_else(default_body);
    let has_content_type = spec
        .headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));

    let mut attempts = Vec::with_capacity(spec.repeat as usize);
    for i in 0..spec.repeat {
        if i > 0 && !spec.delay.is_zero() {
            tokio::time::sleep(spec.delay).await;
        }

        let mut request = client.request(method.clone(), &spec.url);
        if !has_content_type {
            request = request.header(CONTENT_TYPE, "application/json");
        }
        for (name, value) in &spec.headers {
            request = request.header(name, value);
        }
        // GET and HEAD carry no body, everything else sends the JSON payload.
        if method != Method::GET && method != Method::HEAD {
            request = request.json(&body);
        }

        let start = Instant::now();
        let outcome = match request.send().await {
            Ok(response) => Outcome::Status(response.status().as_u16()),
            Err(err) => Outcome::Failed(err.to_string()),
        };
        let elapsed = start.elapsed();

        match &outcome {
            Outcome::Status(code) => info!("{} - {}ms", code, elapsed.as_millis()),
            Outcome::Failed(reason) => warn!("attempt {} failed: {}", i + 1, reason),
        }

        attempts.push(Attempt { outcome, elapsed });
    }

    Ok(attempts)
}
