//! Rate-limited HTTP access to the upstream search API.
//!
//! **Why the trait**: every consumer — fetcher, retriever, tests — talks to
//! the upstream through [`DeviceApi`], so the whole pipeline runs against a
//! canned stub without a network. The real implementation, [`FdaClient`],
//! enforces the fair-use contract: a hard minimum delay between requests,
//! a fixed per-call timeout, and exactly one retry on transient failures.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RetrievalConfig;

/// Transport seam for the upstream search API.
pub trait DeviceApi: Send + Sync {
    /// Issue one GET request and return the parsed JSON body.
    fn get_json(&self, url: &str) -> Result<Value, ClientError>;
}

/// Errors from a single upstream call.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The upstream rejected this specific query (4xx). Not retried; the
    /// caller skips the offending variant.
    #[error("upstream rejected query at {url}: HTTP {status}")]
    BadQuery {
        url: String,
        status: u16,
        message: String,
    },

    /// Network failure, timeout, 429, or 5xx that survived the retry.
    #[error("upstream unavailable at {url} (status {status:?})")]
    UpstreamUnavailable { url: String, status: Option<u16> },

    /// 2xx response whose body was not valid JSON.
    #[error("invalid JSON from {url}: {message}")]
    InvalidResponse { url: String, message: String },
}

impl ClientError {
    /// The upstream reports "no matches" as a 404 — an empty answer, not a
    /// failure.
    pub fn is_no_matches(&self) -> bool {
        matches!(self, ClientError::BadQuery { status: 404, .. })
    }
}

/// What a response status means for retry policy.
#[derive(Debug, PartialEq, Eq)]
enum StatusClass {
    Success,
    /// Timeout, 429, or 5xx — retried once.
    Transient,
    /// Other 4xx — the query itself is wrong.
    Bad,
}

fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        429 => StatusClass::Transient,
        400..=499 => StatusClass::Bad,
        _ => StatusClass::Transient,
    }
}

/// Blocking HTTP client with a per-instance rate-limit floor.
pub struct FdaClient {
    http: reqwest::blocking::Client,
    min_delay: Duration,
    retry_backoff: Duration,
    /// When the previous request was issued. Interior mutability so the
    /// client can be shared behind `&self`.
    last_call: Mutex<Option<Instant>>,
}

impl FdaClient {
    /// Build a client from pipeline configuration.
    pub fn new(config: &RetrievalConfig) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                warn!(error = %e, "failed to build HTTP client");
                ClientError::UpstreamUnavailable {
                    url: config.base_url.clone(),
                    status: None,
                }
            })?;
        Ok(Self {
            http,
            min_delay: Duration::from_millis(config.min_request_delay_ms),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            last_call: Mutex::new(None),
        })
    }

    /// Sleep until at least `min_delay` has passed since the previous call,
    /// then advance the last-call timestamp.
    fn pace(&self) {
        let mut last = match self.last_call.lock() {
            Ok(guard) => guard,
            // A poisoned pace lock only loses the delay bookkeeping.
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_delay {
                std::thread::sleep(self.min_delay - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    /// One paced attempt. `Ok(Err(..))` is a transient failure eligible for
    /// retry; `Err(..)` is final.
    fn attempt(&self, url: &str) -> Result<Value, AttemptError> {
        self.pace();
        let response = self.http.get(url).send().map_err(|e| {
            if e.is_timeout() {
                debug!(url, "request timed out");
                AttemptError::Transient(None)
            } else {
                AttemptError::Transient(e.status().map(|s| s.as_u16()))
            }
        })?;

        let status = response.status().as_u16();
        match classify_status(status) {
            StatusClass::Success => response.json().map_err(|e| {
                AttemptError::Fatal(ClientError::InvalidResponse {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }),
            StatusClass::Transient => Err(AttemptError::Transient(Some(status))),
            StatusClass::Bad => {
                let message = response.text().unwrap_or_default();
                Err(AttemptError::Fatal(ClientError::BadQuery {
                    url: url.to_string(),
                    status,
                    message: truncate_body(&message),
                }))
            }
        }
    }
}

enum AttemptError {
    Transient(Option<u16>),
    Fatal(ClientError),
}

impl DeviceApi for FdaClient {
    fn get_json(&self, url: &str) -> Result<Value, ClientError> {
        match self.attempt(url) {
            Ok(body) => Ok(body),
            Err(AttemptError::Fatal(e)) => Err(e),
            Err(AttemptError::Transient(status)) => {
                warn!(url, ?status, "transient upstream failure, retrying once");
                std::thread::sleep(self.retry_backoff);
                match self.attempt(url) {
                    Ok(body) => Ok(body),
                    Err(AttemptError::Fatal(e)) => Err(e),
                    Err(AttemptError::Transient(status)) => {
                        Err(ClientError::UpstreamUnavailable {
                            url: url.to_string(),
                            status,
                        })
                    }
                }
            }
        }
    }
}

/// Error bodies can be large HTML pages; keep only enough to diagnose.
fn truncate_body(body: &str) -> String {
    body.chars().take(200).collect()
}
