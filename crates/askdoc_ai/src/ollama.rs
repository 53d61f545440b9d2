use std::thread;
use std::time::Duration;

use askdoc_core::config::AppConfig;
use askdoc_core::error::AppError;
use tracing::warn;

/// Bounded retry for provider calls. Only errors flagged `retryable` are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(0),
        }
    }

    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Run `op`, retrying retryable failures with linear backoff; the last error wins.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Result<T, AppError>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if e.retryable && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        call = what,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "retrying provider call"
                    );
                    thread::sleep(self.backoff * attempt);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    embed_timeout: Duration,
    chat_timeout: Duration,
    retry: RetryPolicy,
}

impl OllamaClient {
    /// Create a client for an Ollama server at `base_url` (`http://host[:port]`).
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        validate_base_url(&base_url)?;

        Ok(Self {
            base_url,
            embed_timeout: Duration::from_secs(10),
            chat_timeout: Duration::from_secs(120),
            retry: RetryPolicy::none(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self::new(&config.ollama_base_url)?
            .with_timeouts(
                Duration::from_millis(config.embed_timeout_ms),
                Duration::from_millis(config.chat_timeout_ms),
            )
            .with_retry(RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_backoff_ms),
            )))
    }

    pub fn with_timeouts(mut self, embed: Duration, chat: Duration) -> Self {
        self.embed_timeout = embed;
        self.chat_timeout = chat;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn embed_timeout(&self) -> Duration {
        self.embed_timeout
    }

    pub fn chat_timeout(&self) -> Duration {
        self.chat_timeout
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url)
            .timeout(Duration::from_millis(800))
            .call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(
                AppError::new("AI_OLLAMA_UNHEALTHY", "Ollama health check failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(ureq::Error::Status(code, _)) => Err(
                AppError::new("AI_OLLAMA_UNHEALTHY", "Ollama health check failed")
                    .with_details(format!("status={code}")),
            ),
            Err(e) => Err(AppError::new(
                "AI_OLLAMA_UNREACHABLE",
                "Failed to reach Ollama",
            )
            .with_details(format!("base_url={}; err={}", self.base_url, e))
            .with_retryable(true)),
        }
    }
}

fn validate_base_url(base_url: &str) -> Result<(), AppError> {
    let invalid = |why: &str| {
        Err(
            AppError::new("AI_BASE_URL_INVALID", "Ollama base URL must look like http://host[:port]")
                .with_details(format!("base_url={base_url}; reason={why}")),
        )
    };

    let Some(rest) = base_url.strip_prefix("http://") else {
        return invalid("scheme must be http");
    };
    if rest.contains('/') {
        return invalid("path segments are not allowed");
    }
    // Harden against `127.0.0.1@evil.com` style userinfo tricks.
    if rest.contains('@') {
        return invalid("userinfo is not allowed");
    }

    let (host, port) = if let Some(inner) = rest.strip_prefix('[') {
        // Bracketed IPv6 literal.
        let Some((addr, after)) = inner.split_once(']') else {
            return invalid("unterminated IPv6 literal");
        };
        let port = match after {
            "" => None,
            p => match p.strip_prefix(':') {
                Some(p) => Some(p),
                None => return invalid("garbage after IPv6 literal"),
            },
        };
        (addr, port)
    } else {
        match rest.rsplit_once(':') {
            Some((h, p)) => (h, Some(p)),
            None => (rest, None),
        }
    };

    if host.is_empty() {
        return invalid("host is empty");
    }
    if let Some(p) = port {
        match p.parse::<u16>() {
            Ok(0) | Err(_) => return invalid("port must be 1-65535"),
            Ok(_) => {}
        }
    }
    Ok(())
}

/// Truncate to at most `max_bytes`, backing off to the nearest char boundary.
pub(crate) fn truncate_at_char_boundary(input: &str, max_bytes: usize) -> &str {
    if input.len() <= max_bytes {
        return input;
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    &input[..end]
}
