//! Document fetching for local paths and http(s) URLs
//!
//! Input strings are classified before any I/O happens. URLs are fetched
//! through an [`HttpTransport`] with a bounded per-request timeout and
//! exponential backoff on transient failures; local paths are read directly.

use crate::detect::SpecVersion;
use crate::loader::LoadSettings;
use specmill_common::SpecError;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

/// Longest body excerpt carried by a non-retryable HTTP failure
const SNIPPET_LIMIT: usize = 1024;

/// Granularity of cancellation checks while backing off
const CANCEL_POLL: Duration = Duration::from_millis(25);

/// Where a document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Absolute filesystem path
    File(PathBuf),
    /// http or https URL
    Url(Url),
}

impl Location {
    pub fn is_file(&self) -> bool {
        matches!(self, Location::File(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::File(path) => write!(f, "{}", path.display()),
            Location::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Classify an input string as a URL or a local path
///
/// `file:` URLs and any scheme other than http/https are rejected as
/// `InputError` whether or not the target exists.
pub fn classify_input(input: &str) -> Result<Location, SpecError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SpecError::input("Input is empty"));
    }

    if let Ok(url) = Url::parse(trimmed) {
        let scheme = url.scheme().to_ascii_lowercase();
        if scheme == "file" {
            return Err(
                SpecError::input("file:// URLs are blocked; pass a filesystem path instead")
                    .with_location(trimmed),
            );
        }
        if url.has_host() && url.host_str().is_some_and(|h| !h.is_empty()) {
            if scheme != "http" && scheme != "https" {
                return Err(SpecError::input(format!(
                    "Unsupported URL scheme '{}' (only http and https are allowed)",
                    scheme
                ))
                .with_location(trimmed));
            }
            debug!(url = %url, "classified input as URL");
            return Ok(Location::Url(url));
        }
    }

    let path = std::path::absolute(trimmed).map_err(|e| {
        SpecError::input(format!("Failed to resolve path {}: {}", trimmed, e))
            .with_location(trimmed)
            .with_source(e)
    })?;
    debug!(path = %path.display(), "classified input as local path");
    Ok(Location::File(path))
}

/// Raw response from a single HTTP attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Connection-level failure of a single HTTP attempt
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError(format!("request timed out: {}", err))
        } else {
            TransportError(err.to_string())
        }
    }
}

/// One blocking GET per call; retries live in [`fetch_with_retry`]
#[cfg_attr(test, mockall::automock)]
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &Url, timeout: Duration) -> Result<TransportResponse, TransportError>;
}

/// Default transport backed by `reqwest::blocking`
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("specmill/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &Url, timeout: Duration) -> Result<TransportResponse, TransportError> {
        let response = self.client.get(url.clone()).timeout(timeout).send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        Ok(TransportResponse { status, body })
    }
}

/// Failure of a fetch with retries
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("transient HTTP status {0}")]
    Transient(u16),

    #[error("HTTP {status}: {snippet}")]
    Status { status: u16, snippet: String },

    #[error("giving up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

/// GET `url`, retrying transport errors, 5xx, and 429
///
/// Makes one initial attempt plus up to `max_retries` retries, sleeping
/// `backoff_base * 2^(n-1)` before retry `n`. The token is checked before
/// every request and while sleeping.
#[instrument(skip(transport, settings, cancel), fields(url = %url))]
pub fn fetch_with_retry(
    transport: &dyn HttpTransport,
    url: &Url,
    settings: &LoadSettings,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, FetchError> {
    let attempts = settings.max_retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let err = match transport.get(url, settings.http_timeout) {
            Ok(response) if (200..300).contains(&response.status) => {
                debug!(attempt, status = response.status, bytes = response.body.len(), "fetched");
                return Ok(response.body);
            }
            Ok(response) if response.status >= 500 || response.status == 429 => {
                FetchError::Transient(response.status)
            }
            Ok(response) => {
                return Err(FetchError::Status {
                    status: response.status,
                    snippet: snippet(&response.body),
                });
            }
            Err(e) => FetchError::Transport(e),
        };

        if attempt >= attempts {
            return Err(FetchError::Exhausted {
                attempts,
                last: Box::new(err),
            });
        }

        let delay = backoff_delay(settings.backoff_base, attempt);
        debug!(attempt, error = %err, delay_ms = delay.as_millis() as u64, "retrying fetch");
        if !sleep_unless_cancelled(delay, cancel) {
            return Err(FetchError::Cancelled);
        }
    }
}

/// Delay before retry number `retry` (1-based)
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent)
}

fn sleep_unless_cancelled(delay: Duration, cancel: &CancellationToken) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(CANCEL_POLL));
    }
}

fn snippet(body: &[u8]) -> String {
    let end = body.len().min(SNIPPET_LIMIT);
    String::from_utf8_lossy(&body[..end]).trim().to_string()
}

/// Bytes of a document plus where they came from
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub location: Location,

    /// Set once the detector has classified the bytes
    pub version: Option<SpecVersion>,
}

/// Reads documents from disk or over HTTP
pub struct Fetcher {
    settings: LoadSettings,
    transport: OnceLock<Arc<dyn HttpTransport>>,
    cancel: CancellationToken,
}

impl Fetcher {
    pub fn new(settings: LoadSettings) -> Self {
        Self {
            settings,
            transport: OnceLock::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use a specific transport instead of the default reqwest client
    pub fn with_transport(self, transport: Arc<dyn HttpTransport>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(transport);
        Self {
            transport: cell,
            ..self
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &LoadSettings {
        &self.settings
    }

    /// Fetch a document; URL failures are `NetworkError`, file failures `InputError`
    pub fn fetch(&self, location: &Location) -> Result<RawDocument, SpecError> {
        let bytes = self.fetch_bytes(location)?;
        Ok(RawDocument {
            bytes,
            location: location.clone(),
            version: None,
        })
    }

    pub fn fetch_bytes(&self, location: &Location) -> Result<Vec<u8>, SpecError> {
        match location {
            Location::File(path) => std::fs::read(path).map_err(|e| {
                SpecError::input(format!("Failed to read file {}: {}", path.display(), e))
                    .with_location(location)
                    .with_source(e)
            }),
            Location::Url(url) => {
                let transport = self.transport().map_err(|e| {
                    SpecError::network(format!("Failed to create HTTP client: {}", e))
                        .with_location(location)
                        .with_source(e)
                })?;
                fetch_with_retry(transport.as_ref(), url, &self.settings, &self.cancel).map_err(
                    |e| {
                        SpecError::network(format!("Failed to fetch {}: {}", url, e))
                            .with_location(location)
                            .with_source(e)
                    },
                )
            }
        }
    }

    fn transport(&self) -> Result<Arc<dyn HttpTransport>, TransportError> {
        if let Some(transport) = self.transport.get() {
            return Ok(Arc::clone(transport));
        }
        let created: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
        Ok(Arc::clone(self.transport.get_or_init(|| created)))
    }
}
