//! HTTP browser backend.
//!
//! Loads documents with `reqwest` and serves their markup to the
//! analyzers. There is no script engine or renderer behind it, so script
//! evaluation and screenshots are reported as unsupported.

use super::{Browser, BrowserContext, BrowserLauncher, ContextConfig, Page, PageTiming};
use crate::config::{BrowserConfig, ViewportSize};
use crate::error::BrowserError;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Launches HTTP browser sessions.
pub struct HttpLauncher {
    config: BrowserConfig,
}

impl HttpLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self) -> Result<Arc<dyn Browser>, BrowserError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        info!(
            "HTTP browser session started (timeout {}s)",
            self.config.timeout_seconds
        );

        Ok(Arc::new(HttpBrowser {
            client,
            closed: AtomicBool::new(false),
        }))
    }
}

struct HttpBrowser {
    client: reqwest::Client,
    closed: AtomicBool,
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn new_context(
        &self,
        config: ContextConfig,
    ) -> Result<Arc<dyn BrowserContext>, BrowserError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed);
        }

        debug!(
            "Opening context {}x{} (mobile: {})",
            config.viewport.width, config.viewport.height, config.is_mobile
        );

        Ok(Arc::new(HttpContext {
            client: self.client.clone(),
            config,
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct HttpContext {
    client: reqwest::Client,
    config: ContextConfig,
    closed: AtomicBool,
}

#[async_trait]
impl BrowserContext for HttpContext {
    async fn new_page(&self) -> Result<Box<dyn Page>, BrowserError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed);
        }

        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            user_agent: self.config.user_agent.clone(),
            viewport: self.config.viewport,
            document: Mutex::new(None),
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct Document {
    url: String,
    html: String,
    timing: PageTiming,
}

struct HttpPage {
    client: reqwest::Client,
    user_agent: String,
    viewport: ViewportSize,
    document: Mutex<Option<Document>>,
    closed: AtomicBool,
}

impl HttpPage {
    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }

    async fn fetch(&self, url: url::Url) -> Result<Document, BrowserError> {
        let started = Instant::now();

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| navigation_error(url.as_str(), e))?;
        let time_to_first_byte = started.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| navigation_error(url.as_str(), e))?;

        Ok(Document {
            url: final_url,
            timing: PageTiming {
                time_to_first_byte_ms: time_to_first_byte.as_millis() as u64,
                load_time_ms: started.elapsed().as_millis() as u64,
                transfer_bytes: html.len() as u64,
            },
            html,
        })
    }
}

fn navigation_error(url: &str, e: reqwest::Error) -> BrowserError {
    let reason = if e.is_connect() {
        "connection refused".to_string()
    } else {
        e.to_string()
    };
    BrowserError::Navigation {
        url: url.to_string(),
        reason,
    }
}

#[async_trait]
impl Page for HttpPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.ensure_open()?;

        let parsed = url::Url::parse(url).map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            reason: format!("invalid URL: {}", e),
        })?;

        debug!("Navigating to {}", parsed);

        let document = match tokio::time::timeout(timeout, self.fetch(parsed)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BrowserError::Timeout {
                    url: url.to_string(),
                    seconds: timeout.as_secs(),
                })
            }
        };

        debug!(
            "Loaded {} ({} bytes in {}ms)",
            document.url, document.timing.transfer_bytes, document.timing.load_time_ms
        );

        *self.document.lock().await = Some(document);
        Ok(())
    }

    async fn url(&self) -> Option<String> {
        self.document.lock().await.as_ref().map(|d| d.url.clone())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.ensure_open()?;
        self.document
            .lock()
            .await
            .as_ref()
            .map(|d| d.html.clone())
            .ok_or(BrowserError::NotLoaded)
    }

    async fn evaluate(&self, _expression: &str) -> Result<Value, BrowserError> {
        self.ensure_open()?;
        Err(BrowserError::Unsupported("script evaluation"))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        self.ensure_open()?;
        Err(BrowserError::Unsupported("screenshots"))
    }

    async fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    async fn timing(&self) -> Result<PageTiming, BrowserError> {
        self.ensure_open()?;
        self.document
            .lock()
            .await
            .as_ref()
            .map(|d| d.timing)
            .ok_or(BrowserError::NotLoaded)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn open_page() -> Box<dyn Page> {
        let config = BrowserConfig::default();
        let browser = HttpLauncher::new(config.clone()).launch().await.unwrap();
        let context = browser
            .new_context(ContextConfig::desktop(&config))
            .await
            .unwrap();
        context.new_page().await.unwrap()
    }

    #[tokio::test]
    async fn test_goto_loads_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>hi</body></html>"))
            .mount(&server)
            .await;

        let page = open_page().await;
        page.goto(&server.uri(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(page.content().await.unwrap().contains("hi"));
        let timing = page.timing().await.unwrap();
        assert_eq!(timing.transfer_bytes, 28);
        assert!(page.url().await.is_some());
    }

    #[tokio::test]
    async fn test_mobile_context_sends_mobile_user_agent() {
        let server = MockServer::start().await;
        let config = BrowserConfig::default();
        Mock::given(method("GET"))
            .and(header("user-agent", config.mobile_user_agent.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let browser = HttpLauncher::new(config.clone()).launch().await.unwrap();
        let context = browser
            .new_context(ContextConfig::mobile(&config))
            .await
            .unwrap();
        let page = context.new_page().await.unwrap();

        page.goto(&server.uri(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(page.viewport().await.width, 375);
    }

    #[tokio::test]
    async fn test_http_error_is_navigation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let page = open_page().await;
        let err = page
            .goto(&server.uri(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::Navigation { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let page = open_page().await;
        let err = page
            .goto(&server.uri(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_invalid_url_is_navigation_failure() {
        let page = open_page().await;
        let err = page
            .goto("not a url", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::Navigation { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_capabilities_and_close() {
        let page = open_page().await;

        assert!(matches!(
            page.content().await,
            Err(BrowserError::NotLoaded)
        ));
        assert!(matches!(
            page.screenshot().await,
            Err(BrowserError::Unsupported(_))
        ));
        assert!(matches!(
            page.evaluate("document.title").await,
            Err(BrowserError::Unsupported(_))
        ));

        page.close().await.unwrap();
        page.close().await.unwrap();
        assert!(matches!(page.content().await, Err(BrowserError::Closed)));
    }
}
