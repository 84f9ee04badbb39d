//! Error types.
//!
//! Library-level failures are typed so the orchestrator can decide which
//! ones are fatal, which ones are recorded into the result, and which ones
//! become synthetic issues. Application glue uses `anyhow` on top of these.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a browser-automation backend.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The backend could not be started.
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// The page could not be loaded.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The page did not load within the configured timeout.
    #[error("navigation to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    /// The page has not been navigated yet.
    #[error("page has no document loaded")]
    NotLoaded,

    /// The page or context was already closed.
    #[error("page is closed")]
    Closed,

    /// The backend does not provide this capability.
    #[error("{0} is not supported by this browser backend")]
    Unsupported(&'static str),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures raised by a single analyzer.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// The CSS selector given for an element-scoped check is invalid.
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The analyzer panicked while running.
    #[error("analyzer panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Internal(String),
}

/// Failures raised by report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// No reporter is registered for the requested format.
    #[error("no reporter registered for format '{0}'")]
    UnknownFormat(String),

    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures surfaced by the orchestrator to its callers.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// `analyze_page` was called before `initialize` (or after `close`).
    #[error("orchestrator is not initialized; call initialize() first")]
    NotInitialized,

    #[error(transparent)]
    Browser(#[from] BrowserError),
}
