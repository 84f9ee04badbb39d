//! Browser-automation seam.
//!
//! The analysis pipeline only talks to these traits. A backend provides a
//! launcher that starts one long-lived session, contexts with their own
//! viewport and user agent, and pages that can be navigated and inspected.

pub mod http;

pub use http::HttpLauncher;

use crate::config::{BrowserConfig, ViewportSize};
use crate::error::BrowserError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Settings for a browsing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub viewport: ViewportSize,
    pub user_agent: String,
    pub is_mobile: bool,
}

impl ContextConfig {
    /// The default desktop context.
    pub fn desktop(config: &BrowserConfig) -> Self {
        Self {
            viewport: config.desktop_viewport,
            user_agent: config.user_agent.clone(),
            is_mobile: false,
        }
    }

    /// A mobile-emulated context.
    pub fn mobile(config: &BrowserConfig) -> Self {
        Self {
            viewport: config.mobile_viewport,
            user_agent: config.mobile_user_agent.clone(),
            is_mobile: true,
        }
    }
}

/// Load timing of the current document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTiming {
    /// Time until the response headers arrived.
    pub time_to_first_byte_ms: u64,
    /// Time until the whole document was received.
    pub load_time_ms: u64,
    /// Size of the document body.
    pub transfer_bytes: u64,
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Browser>, BrowserError>;
}

/// A running browser session.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_context(
        &self,
        config: ContextConfig,
    ) -> Result<Arc<dyn BrowserContext>, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

/// An isolated browsing context (cookies, viewport, user agent).
#[async_trait]
pub trait BrowserContext: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn Page>, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

/// A single page (tab).
#[async_trait]
pub trait Page: Send + Sync {
    /// Loads `url`, failing with [`BrowserError::Timeout`] after `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// URL of the loaded document, if any.
    async fn url(&self) -> Option<String>;

    /// Serialized markup of the loaded document.
    async fn content(&self) -> Result<String, BrowserError>;

    /// Evaluates a script expression in the page.
    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError>;

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;

    /// Viewport the page was opened with; fixed by its context.
    async fn viewport(&self) -> ViewportSize;

    async fn timing(&self) -> Result<PageTiming, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}
