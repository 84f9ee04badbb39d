//! In-memory browser and analyzers for tests.
//!
//! `FakeLauncher` serves scripted documents by URL and counts every
//! context and page it opens and closes, so tests can assert that the
//! pipeline releases what it acquires.

use crate::analyzers::{Analyzer, Pass};
use crate::browser::{Browser, BrowserContext, BrowserLauncher, ContextConfig, Page, PageTiming};
use crate::config::ViewportSize;
use crate::error::{AnalyzerError, BrowserError};
use crate::models::{Fragment, Issue, Severity};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Counters shared by everything a launcher hands out.
#[derive(Debug, Default)]
pub struct FakeState {
    launches: AtomicUsize,
    browsers_closed: AtomicUsize,
    contexts_opened: AtomicUsize,
    contexts_closed: AtomicUsize,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    mobile_seen: AtomicBool,
}

impl FakeState {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn browsers_closed(&self) -> usize {
        self.browsers_closed.load(Ordering::SeqCst)
    }

    pub fn contexts_opened(&self) -> usize {
        self.contexts_opened.load(Ordering::SeqCst)
    }

    pub fn contexts_closed(&self) -> usize {
        self.contexts_closed.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    pub fn saw_mobile_context(&self) -> bool {
        self.mobile_seen.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Script {
    pages: HashMap<String, String>,
    fail_launch: bool,
    fail_mobile_navigation: bool,
}

/// Launcher for the scripted browser.
#[derive(Default)]
pub struct FakeLauncher {
    script: Script,
    state: Arc<FakeState>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `html` for `url`. Any other URL fails to navigate.
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.script.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.script.fail_launch = true;
        self
    }

    /// Navigation fails in mobile contexts only.
    pub fn fail_mobile_navigation(mut self) -> Self {
        self.script.fail_mobile_navigation = true;
        self
    }

    pub fn state(&self) -> Arc<FakeState> {
        Arc::clone(&self.state)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Arc<dyn Browser>, BrowserError> {
        if self.script.fail_launch {
            return Err(BrowserError::Launch("no browser binary".to_string()));
        }
        self.state.launches.fetch_add(1, Ordering::SeqCst);

        Ok(Arc::new(FakeBrowser {
            pages: Arc::new(self.script.pages.clone()),
            fail_mobile_navigation: self.script.fail_mobile_navigation,
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeBrowser {
    pages: Arc<HashMap<String, String>>,
    fail_mobile_navigation: bool,
    state: Arc<FakeState>,
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_context(
        &self,
        config: ContextConfig,
    ) -> Result<Arc<dyn BrowserContext>, BrowserError> {
        self.state.contexts_opened.fetch_add(1, Ordering::SeqCst);
        if config.is_mobile {
            self.state.mobile_seen.store(true, Ordering::SeqCst);
        }

        Ok(Arc::new(FakeContext {
            fail_navigation: config.is_mobile && self.fail_mobile_navigation,
            config,
            pages: Arc::clone(&self.pages),
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.state.browsers_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeContext {
    config: ContextConfig,
    pages: Arc<HashMap<String, String>>,
    fail_navigation: bool,
    state: Arc<FakeState>,
    closed: AtomicBool,
}

#[async_trait]
impl BrowserContext for FakeContext {
    async fn new_page(&self) -> Result<Box<dyn Page>, BrowserError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed);
        }
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(FakePage {
            pages: Arc::clone(&self.pages),
            fail_navigation: self.fail_navigation,
            viewport: self.config.viewport,
            loaded: Mutex::new(None),
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.contexts_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct FakePage {
    pages: Arc<HashMap<String, String>>,
    fail_navigation: bool,
    viewport: ViewportSize,
    loaded: Mutex<Option<String>>,
    state: Arc<FakeState>,
    closed: AtomicBool,
}

impl FakePage {
    fn check_open(&self) -> Result<(), BrowserError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        self.check_open()?;
        if self.fail_navigation || !self.pages.contains_key(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        *self.loaded.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn url(&self) -> Option<String> {
        self.loaded.lock().unwrap().clone()
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.check_open()?;
        let loaded = self.loaded.lock().unwrap().clone();
        loaded
            .and_then(|url| self.pages.get(&url).cloned())
            .ok_or(BrowserError::NotLoaded)
    }

    async fn evaluate(&self, _expression: &str) -> Result<Value, BrowserError> {
        Err(BrowserError::Unsupported("script evaluation"))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        self.check_open()?;
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }

    async fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    async fn timing(&self) -> Result<PageTiming, BrowserError> {
        let html = self.content().await?;
        Ok(PageTiming {
            time_to_first_byte_ms: 20,
            load_time_ms: 120,
            transfer_bytes: html.len() as u64,
        })
    }

    async fn close(&self) -> Result<(), BrowserError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

enum Behavior {
    Report { title: String, severity: Severity },
    Fail,
    Panic,
}

/// Analyzer with a fixed outcome.
pub struct StaticAnalyzer {
    name: String,
    passes: Vec<Pass>,
    behavior: Behavior,
}

impl StaticAnalyzer {
    /// Reports one `test` issue.
    pub fn issue(name: &str, passes: &[Pass], title: &str, severity: Severity) -> Self {
        Self {
            name: name.to_string(),
            passes: passes.to_vec(),
            behavior: Behavior::Report {
                title: title.to_string(),
                severity,
            },
        }
    }

    pub fn failing(name: &str, passes: &[Pass]) -> Self {
        Self {
            name: name.to_string(),
            passes: passes.to_vec(),
            behavior: Behavior::Fail,
        }
    }

    pub fn panicking(name: &str, passes: &[Pass]) -> Self {
        Self {
            name: name.to_string(),
            passes: passes.to_vec(),
            behavior: Behavior::Panic,
        }
    }
}

#[async_trait]
impl Analyzer for StaticAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, pass: &Pass) -> bool {
        self.passes.contains(pass)
    }

    async fn analyze(&self, _page: &dyn Page, _pass: &Pass) -> Result<Fragment, AnalyzerError> {
        match &self.behavior {
            Behavior::Report { title, severity } => {
                let mut fragment = Fragment::new();
                fragment.push(Issue::new("test", title.as_str(), *severity));
                fragment.metric("ran", true);
                Ok(fragment)
            }
            Behavior::Fail => Err(AnalyzerError::Internal(format!("{} failed on purpose", self.name))),
            Behavior::Panic => panic!("{} exploded", self.name),
        }
    }
}
