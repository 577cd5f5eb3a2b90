use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{info, warn};
use url::Url;

use crate::errors::SummarizeError;

/// Desktop browser UA; many article sites serve bots a stripped page.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X) AppleWebKit/537.36 Safari/537.36";

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(25);

/// Source of raw HTML for a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_html(&self, url: &Url) -> Result<String, SummarizeError>;
}

struct FetchFailure {
    error: SummarizeError,
    transient: bool,
}

impl FetchFailure {
    fn permanent(error: SummarizeError) -> Self {
        Self {
            error,
            transient: false,
        }
    }

    fn transient(error: SummarizeError) -> Self {
        Self {
            error,
            transient: true,
        }
    }
}

/// `reqwest`-backed fetcher with retry on connection errors and 5xx.
pub struct HttpFetcher {
    client: Client,
    max_retries: usize,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, SummarizeError> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| SummarizeError::HttpError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            max_retries: 2,
        })
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, FetchFailure> {
        let response = self.client.get(url.as_str()).send().await.map_err(|e| {
            let transient = e.is_connect() || e.is_timeout();
            let error = SummarizeError::HttpError(format!("GET {url} failed: {e}"));
            if transient {
                FetchFailure::transient(error)
            } else {
                FetchFailure::permanent(error)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error = SummarizeError::HttpError(format!("GET {url} returned {status}"));
            return Err(if status.is_server_error() {
                FetchFailure::transient(error)
            } else {
                FetchFailure::permanent(error)
            });
        }

        response.text().await.map_err(|e| {
            FetchFailure::permanent(SummarizeError::HttpError(format!(
                "Failed to read body of {url}: {e}"
            )))
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String, SummarizeError> {
        info!(url = %url, "Fetching page");

        // 200ms, then 2s
        let strategy = ExponentialBackoff::from_millis(10)
            .factor(20)
            .max_delay(Duration::from_secs(3))
            .map(jitter)
            .take(self.max_retries);

        RetryIf::spawn(
            strategy,
            || self.fetch_once(url),
            |failure: &FetchFailure| {
                if failure.transient {
                    warn!(url = %url, error = %failure.error, "Transient fetch failure, retrying");
                }
                failure.transient
            },
        )
        .await
        .map_err(|failure| failure.error)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::get;

    use super::*;

    #[derive(Clone, Default)]
    struct Hits {
        flaky: Arc<AtomicUsize>,
        missing: Arc<AtomicUsize>,
        down: Arc<AtomicUsize>,
    }

    async fn flaky(State(hits): State<Hits>) -> (StatusCode, &'static str) {
        if hits.flaky.fetch_add(1, Ordering::SeqCst) == 0 {
            (StatusCode::SERVICE_UNAVAILABLE, "busy")
        } else {
            (StatusCode::OK, "<p>back up</p>")
        }
    }

    async fn missing(State(hits): State<Hits>) -> StatusCode {
        hits.missing.fetch_add(1, Ordering::SeqCst);
        StatusCode::NOT_FOUND
    }

    async fn down(State(hits): State<Hits>) -> StatusCode {
        hits.down.fetch_add(1, Ordering::SeqCst);
        StatusCode::SERVICE_UNAVAILABLE
    }

    async fn serve(hits: Hits) -> Url {
        let app = Router::new()
            .route("/flaky", get(flaky))
            .route("/missing", get(missing))
            .route("/down", get(down))
            .with_state(hits);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let hits = Hits::default();
        let base = serve(hits.clone()).await;
        let fetcher = HttpFetcher::new().unwrap();

        let body = fetcher.fetch_html(&base.join("flaky").unwrap()).await.unwrap();
        assert_eq!(body, "<p>back up</p>");
        assert_eq!(hits.flaky.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let hits = Hits::default();
        let base = serve(hits.clone()).await;
        let fetcher = HttpFetcher::new().unwrap();

        let err = fetcher
            .fetch_html(&base.join("missing").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::HttpError(ref msg) if msg.contains("404")));
        assert_eq!(hits.missing.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_stop_after_two() {
        let hits = Hits::default();
        let base = serve(hits.clone()).await;
        let fetcher = HttpFetcher::new().unwrap();

        let err = fetcher
            .fetch_html(&base.join("down").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::HttpError(ref msg) if msg.contains("503")));
        assert_eq!(hits.down.load(Ordering::SeqCst), 3);
    }
}
