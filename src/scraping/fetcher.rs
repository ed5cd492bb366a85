//! Fetch engine for IMDb pages
//!
//! Every request carries a fixed set of browser-like headers. Transient
//! failures (network errors, timeouts, 5xx/429 responses, empty bodies and
//! anti-bot interstitials) are retried with exponential backoff up to a
//! bounded attempt count; everything else fails immediately.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::{ScrapingConfig, DEFAULT_USER_AGENT};

/// Body markers of anti-bot interstitial pages (matched case-insensitively)
const BOT_CHALLENGE_MARKERS: &[&str] = &["captcha", "are you human"];

/// Why a single attempt failed in a way that is worth retrying
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientReason {
    Network(String),
    Timeout,
    Status(u16),
    EmptyBody,
    BotChallenge,
}

impl fmt::Display for TransientReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network error: {}", e),
            Self::Timeout => f.write_str("request timed out"),
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::EmptyBody => f.write_str("empty response body"),
            Self::BotChallenge => f.write_str("anti-bot challenge page"),
        }
    }
}

/// Errors that can occur during fetching.
///
/// All variants are permanent from the caller's point of view: the URL
/// should be skipped and the run should continue.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("gave up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: TransientReason,
    },
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("Failed to parse URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl FetchError {
    /// True when the retry budget was spent on transient failures
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Failure of one transport round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout,
    Network(String),
}

/// Unprocessed response from a transport
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

/// A single GET round trip.
///
/// Production uses [`ReqwestTransport`]; tests script responses.
#[async_trait]
pub trait PageTransport: Send + Sync {
    async fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<RawResponse, TransportError>;
}

/// `reqwest`-backed transport
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageTransport for ReqwestTransport {
    async fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<RawResponse, TransportError> {
        let mut request = self.client.get(url.as_str());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let body = response.text().await.map_err(classify_reqwest_error)?;

        Ok(RawResponse {
            final_url,
            status,
            body,
        })
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}

/// Configuration for the fetch engine
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,
    /// Accept-Language header
    pub accept_language: String,
    /// Referer header
    pub referer: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Total attempts per URL
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles afterwards
    pub backoff_base: Duration,
    /// Minimum backoff after an anti-bot page, multiplied by the attempt number
    pub captcha_backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            referer: "https://www.imdb.com/".to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 10,
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            captcha_backoff: Duration::from_secs(5),
        }
    }
}

impl From<&ScrapingConfig> for FetchConfig {
    fn from(config: &ScrapingConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
            referer: config.referer.clone(),
            timeout: config.request_timeout(),
            connect_timeout: config.connect_timeout(),
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff(),
            captcha_backoff: config.captcha_backoff(),
            ..Self::default()
        }
    }
}

impl FetchConfig {
    /// Delay before the attempt following failed attempt number `attempt` (1-based)
    pub fn backoff_after(&self, attempt: u32, reason: &TransientReason) -> Duration {
        match reason {
            TransientReason::BotChallenge => {
                self.captcha_backoff.max(self.captcha_backoff * attempt)
            }
            _ => self
                .backoff_base
                .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1))),
        }
    }
}

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: Url,
    /// The fetched URL (may differ from request due to redirects)
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Response body (HTML content)
    pub body: String,
    /// Attempts used, including the successful one
    pub attempts: u32,
    /// Time taken including backoff sleeps
    pub fetch_duration: Duration,
}

/// Fetch statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Total transport round trips
    pub total_requests: u64,
    /// Pages returned to callers
    pub successes: u64,
    /// Attempts that were retried
    pub retries: u64,
    /// URLs given up on
    pub failures: u64,
    /// Anti-bot pages seen
    pub bot_challenges: u64,
}

#[derive(Default)]
struct FetchCounters {
    total_requests: AtomicU64,
    successes: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
    bot_challenges: AtomicU64,
}

/// Outcome of classifying one raw response
enum Attempt {
    Done(RawResponse),
    Retry(TransientReason),
    Fail(FetchError),
}

/// Retrying fetch engine
pub struct FetchEngine {
    transport: Arc<dyn PageTransport>,
    config: FetchConfig,
    counters: FetchCounters,
}

impl FetchEngine {
    /// Create a fetch engine backed by `reqwest`
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a fetch engine over an arbitrary transport
    pub fn with_transport(config: FetchConfig, transport: Arc<dyn PageTransport>) -> Self {
        Self {
            transport,
            config,
            counters: FetchCounters::default(),
        }
    }

    /// Fetch `url`, retrying transient failures with backoff.
    ///
    /// `extra_headers` are sent after the browser headers and may override them.
    pub async fn fetch(
        &self,
        url: &Url,
        extra_headers: &[(String, String)],
    ) -> Result<FetchedPage, FetchError> {
        let start = Instant::now();
        let headers = self.request_headers(extra_headers);
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.counters.total_requests.fetch_add(1, Ordering::Relaxed);

            let outcome = match self.transport.get(url, &headers).await {
                Ok(response) => self.classify(url, response),
                Err(TransportError::Timeout) => Attempt::Retry(TransientReason::Timeout),
                Err(TransportError::Network(e)) => Attempt::Retry(TransientReason::Network(e)),
            };

            let reason = match outcome {
                Attempt::Done(response) => {
                    self.counters.successes.fetch_add(1, Ordering::Relaxed);
                    debug!("Fetched {} in {} attempt(s)", url, attempt);
                    return Ok(FetchedPage {
                        url: url.clone(),
                        final_url: response.final_url,
                        status_code: response.status,
                        body: response.body,
                        attempts: attempt,
                        fetch_duration: start.elapsed(),
                    });
                }
                Attempt::Fail(e) => {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!("Permanent failure fetching {}: {}", url, e);
                    return Err(e);
                }
                Attempt::Retry(reason) => reason,
            };

            if reason == TransientReason::BotChallenge {
                self.counters.bot_challenges.fetch_add(1, Ordering::Relaxed);
            }

            if attempt >= max_attempts {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Giving up on {} after {} attempts (last: {})",
                    url, attempt, reason
                );
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last: reason,
                });
            }

            let delay = self.config.backoff_after(attempt, &reason);
            self.counters.retries.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                attempt, max_attempts, url, reason, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Parse and fetch a URL string
    pub async fn fetch_str(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        self.fetch(&parsed, &[]).await
    }

    fn classify(&self, url: &Url, response: RawResponse) -> Attempt {
        let status = response.status;
        if (200..300).contains(&status) {
            if response.body.trim().is_empty() {
                return Attempt::Retry(TransientReason::EmptyBody);
            }
            if is_bot_challenge(&response.body) {
                return Attempt::Retry(TransientReason::BotChallenge);
            }
            return Attempt::Done(response);
        }

        if status == 408 || status == 429 || status >= 500 {
            Attempt::Retry(TransientReason::Status(status))
        } else {
            Attempt::Fail(FetchError::Status {
                url: url.to_string(),
                status,
            })
        }
    }

    fn request_headers(&self, extra: &[(String, String)]) -> Vec<(String, String)> {
        let mut headers = vec![
            ("User-Agent".to_string(), self.config.user_agent.clone()),
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            ("Accept-Language".to_string(), self.config.accept_language.clone()),
            ("Referer".to_string(), self.config.referer.clone()),
            ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
        ];
        for (name, value) in extra {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }
        headers
    }

    /// Get fetch statistics
    pub fn stats(&self) -> FetchStats {
        FetchStats {
            total_requests: self.counters.total_requests.load(Ordering::Relaxed),
            successes: self.counters.successes.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            bot_challenges: self.counters.bot_challenges.load(Ordering::Relaxed),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

/// Whether a body looks like an anti-bot interstitial
pub fn is_bot_challenge(body: &str) -> bool {
    let lower = body.to_lowercase();
    BOT_CHALLENGE_MARKERS.iter().any(|m| lower.contains(m))
}
