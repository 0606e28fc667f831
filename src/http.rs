// Resilient call layer: one outbound call with a deadline and retry-with-backoff
// for transient provider statuses.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use reqwest::{Client, Request, Response, StatusCode};
use tracing::{debug, warn};

use crate::{config::RetryConfig, error::CallError};

pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

pub fn is_retryable(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status.as_u16())
}

#[derive(Debug, Default)]
pub struct CallStats {
    pub attempts: AtomicUsize,
    pub retries: AtomicUsize,
    pub timeouts: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallStatsSnapshot {
    pub attempts: usize,
    pub retries: usize,
    pub timeouts: usize,
}

enum Attempt {
    Done(Response),
    Retry(Response),
    Failed(CallError),
}

#[derive(Debug, Clone, Default)]
pub struct ResilientClient {
    client: Client,
    stats: Arc<CallStats>,
}

impl ResilientClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            stats: Arc::new(CallStats::default()),
        }
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn stats(&self) -> CallStatsSnapshot {
        CallStatsSnapshot {
            attempts: self.stats.attempts.load(Ordering::SeqCst),
            retries: self.stats.retries.load(Ordering::SeqCst),
            timeouts: self.stats.timeouts.load(Ordering::SeqCst),
        }
    }

    /// Execute `request`, retrying transient statuses, timeouts and connection
    /// failures up to `policy.max_retries` times.
    ///
    /// Any HTTP status, success or not, comes back as `Ok(Response)`; only
    /// network-level failures that outlive the retries are returned as errors.
    pub async fn execute(&self, request: Request, policy: &RetryConfig) -> Result<Response, CallError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let mut current = request.try_clone().ok_or(CallError::NotCloneable)?;
            // reqwest applies this deadline to the body as well as the headers
            *current.timeout_mut() = Some(policy.timeout());
            let outcome = self.attempt(current, policy, attempt).await;

            if attempt > policy.max_retries {
                return match outcome {
                    Attempt::Done(response) | Attempt::Retry(response) => Ok(response),
                    Attempt::Failed(err) => Err(err),
                };
            }

            match outcome {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retry(response) => {
                    warn!(status = response.status().as_u16(), attempt, "transient provider status, retrying");
                }
                Attempt::Failed(err) => {
                    warn!(error = %err, attempt, "provider call failed, retrying");
                }
            }

            self.stats.retries.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(policy.calculate_backoff()).await;
        }
    }

    /// Read the whole response body under the same per-call deadline.
    pub async fn read_body(&self, response: Response, policy: &RetryConfig) -> Result<String, CallError> {
        let body_timeout = CallError::BodyTimeout {
            timeout_ms: policy.timeout_ms,
        };
        match tokio::time::timeout(policy.timeout(), response.text()).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(err)) if err.is_timeout() => {
                self.stats.timeouts.fetch_add(1, Ordering::SeqCst);
                Err(body_timeout)
            }
            Ok(Err(err)) => Err(CallError::Body {
                message: err.to_string(),
            }),
            Err(_) => {
                self.stats.timeouts.fetch_add(1, Ordering::SeqCst);
                Err(body_timeout)
            }
        }
    }

    async fn attempt(&self, request: Request, policy: &RetryConfig, attempt: u32) -> Attempt {
        self.stats.attempts.fetch_add(1, Ordering::SeqCst);
        debug!(method = %request.method(), url = %request.url(), attempt, "provider call");

        match tokio::time::timeout(policy.timeout(), self.client.execute(request)).await {
            Ok(Ok(response)) if is_retryable(response.status()) => Attempt::Retry(response),
            Ok(Ok(response)) => Attempt::Done(response),
            Ok(Err(err)) if !err.is_timeout() => Attempt::Failed(CallError::Network {
                message: err.to_string(),
                attempts: attempt,
            }),
            Ok(Err(_)) | Err(_) => {
                self.stats.timeouts.fetch_add(1, Ordering::SeqCst);
                Attempt::Failed(CallError::Timeout {
                    timeout_ms: policy.timeout_ms,
                    attempts: attempt,
                })
            }
        }
    }
}
