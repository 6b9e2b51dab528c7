//! Shared HTTP plumbing for provider clients: per-provider sliding-window
//! rate limiting plus bounded retry with exponential backoff.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::error::ScrapeError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RETRIES: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Allows at most `max_requests` within any `window`.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    sent: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            sent: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a request slot is free, then claim it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut sent = self.sent.lock().await;
                let now = Instant::now();
                while sent
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.window)
                {
                    sent.pop_front();
                }
                if sent.len() < self.max_requests {
                    sent.push_back(now);
                    return;
                }
                match sent.front() {
                    Some(oldest) => self.window.saturating_sub(now.duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}

/// Delay before retry number `attempt` (0-based).
pub fn backoff_delay(attempt: u32) -> Duration {
    BACKOFF_BASE * 2u32.saturating_pow(attempt)
}

/// A rate-limited JSON client for one provider.
pub struct ApiClient {
    name: &'static str,
    http: reqwest::Client,
    limiter: RateLimiter,
    cancel: Option<Arc<AtomicBool>>,
}

impl ApiClient {
    pub fn new(
        name: &'static str,
        max_requests: usize,
        window: Duration,
    ) -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("artkeeper/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            name,
            http,
            limiter: RateLimiter::new(max_requests, window),
            cancel: None,
        })
    }

    /// Abort pending retries once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// GET `url` and decode the JSON body.
    ///
    /// Returns `Ok(None)` on 404. Connect errors, timeouts and 429/5xx are
    /// retried up to three times; other failures return immediately.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Option<T>, ScrapeError> {
        let mut attempt = 0;
        loop {
            if self.cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed)) {
                return Err(ScrapeError::Cancelled);
            }
            self.limiter.acquire().await;

            match self.send_once(url, query, headers).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < MAX_RETRIES => {
                    let delay = backoff_delay(attempt);
                    log::debug!(
                        "{}: {e}; retrying in {}ms ({}/{MAX_RETRIES})",
                        self.name,
                        delay.as_millis(),
                        attempt + 1
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Option<T>, ScrapeError> {
        let mut req = self
            .http
            .get(url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json");
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let resp = req.send().await.map_err(reqwest::Error::without_url)?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                url: redact(url),
            });
        }

        let text = resp.text().await.map_err(reqwest::Error::without_url)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }
}

/// Strip the query string so API keys never reach logs or error messages.
fn redact(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
        assert_eq!(backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2000));
    }

    #[test]
    fn redact_drops_query() {
        assert_eq!(
            redact("https://api.example/3/movie/1?api_key=secret"),
            "https://api.example/3/movie/1"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn limiter_waits_for_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
