use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::FetchError;

/// Minimum spacing between consecutive requests. Waits only for whatever is
/// left of the interval, so slow responses are not penalised twice.
#[derive(Debug, Clone)]
pub struct Throttle {
    spacing: Duration,
    last: Arc<Mutex<Option<Instant>>>,
}

impl Throttle {
    pub fn new(spacing: Duration) -> Self {
        Self { spacing, last: Arc::new(Mutex::new(None)) }
    }

    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.spacing {
                tokio::time::sleep(self.spacing - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// GET a URL as text. Discovery and lookups only ever need this one call.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Decode a JSON body fetched from `url`.
pub fn decode_json<T: DeserializeOwned>(url: &str, text: &str) -> Result<T, FetchError> {
    serde_json::from_str(text).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        message: format!("{e}. Response: {}", snippet(text)),
    })
}

/// HTTP client for one platform. Each source owns its own so that sources
/// can run side by side while requests to a single platform stay spaced.
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: reqwest::Client,
    throttle: Throttle,
}

impl Fetcher {
    pub fn new(cfg: &SyncConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout())
            .build()?;
        Ok(Self { http, throttle: Throttle::new(cfg.request_spacing()) })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        self.throttle.wait().await;
        debug!(url, "GET");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport { url: url.to_string(), source })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16(), url: url.to_string() });
        }
        Ok(resp)
    }
}

#[async_trait]
impl Fetch for Fetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.send(url).await?;
        resp.text().await.map_err(|source| FetchError::Transport { url: url.to_string(), source })
    }
}

fn snippet(text: &str) -> &str {
    let mut end = text.len().min(200);
    while !text.is_char_boundary(end) { end -= 1; }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn throttle_spaces_consecutive_calls() {
        let t = Throttle::new(Duration::from_millis(300));
        let start = Instant::now();
        t.wait().await;
        t.wait().await;
        t.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_does_not_wait_after_long_gap() {
        let t = Throttle::new(Duration::from_millis(300));
        t.wait().await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        let before = Instant::now();
        t.wait().await;
        assert!(before.elapsed() < Duration::from_millis(300));
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let s = "é".repeat(150);
        assert!(snippet(&s).len() <= 200);
    }

    #[test]
    fn decode_errors_name_the_url_and_body() {
        let err = decode_json::<serde_json::Value>("https://x/oembed", "<html>blocked</html>").unwrap_err();
        assert_eq!(err.url(), "https://x/oembed");
        assert!(err.to_string().contains("<html>blocked"));
    }
}

/// Canned responses keyed by URL, for exercising discovery and sources
/// without a network.
#[cfg(test)]
pub(crate) mod canned {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub(crate) struct Canned {
        pages: HashMap<String, Result<String, u16>>,
        hits: Mutex<Vec<String>>,
    }

    impl Canned {
        pub(crate) fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), Ok(body.to_string()));
            self
        }

        pub(crate) fn status(mut self, url: &str, status: u16) -> Self {
            self.pages.insert(url.to_string(), Err(status));
            self
        }

        pub(crate) fn hits(&self) -> Vec<String> { self.hits.lock().unwrap().clone() }
    }

    #[async_trait]
    impl Fetch for Canned {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            self.hits.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(status)) => Err(FetchError::Status { status: *status, url: url.to_string() }),
                None => Err(FetchError::Status { status: 404, url: url.to_string() }),
            }
        }
    }

    #[async_trait]
    impl Fetch for std::sync::Arc<Canned> {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            self.as_ref().fetch_text(url).await
        }
    }
}
