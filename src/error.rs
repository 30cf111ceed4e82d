use std::future::Future;
use std::time::Duration;

use log::warn;

/// Errors surfaced by the catalog provider and the engine.
///
/// Tempo lookups are deliberately absent from this taxonomy: a failed or
/// empty BPM lookup degrades to `None` and never reaches the caller as an
/// error.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Missing or expired credential; fatal to the current operation and
    /// must prompt re-authentication upstream
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-2xx response from a provider
    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// Malformed or unexpected response shape; never retried
    #[error("unexpected response data: {0}")]
    Data(String),

    /// Transport-level HTTP failure
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no tracks selected")]
    NothingSelected,
}

impl EngineError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Gateway-class statuses and rate limiting are transient; auth and
    /// data-shape failures are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Auth(_) | Self::Data(_) | Self::NothingSelected => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Declarative retry policy keyed by error classification rather than
/// inline status-code branches.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Run `op`, retrying transient failures up to `max_attempts` total
    /// tries with a fixed backoff. Permanent failures surface immediately.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        "Transient provider failure (attempt {attempt}/{}): {e}",
                        self.max_attempts
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
