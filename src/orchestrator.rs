//! Analysis orchestration.
//!
//! The orchestrator owns one long-lived browser session and a default
//! desktop context. Every `analyze_page` call opens its own page in that
//! context, so concurrent calls share no page state.

use crate::analysis::{Aggregator, AnalyzerRunner, TierRequest};
use crate::analyzers::{self, Analyzer};
use crate::browser::{Browser, BrowserContext, BrowserLauncher, ContextConfig, HttpLauncher, Page};
use crate::config::Config;
use crate::error::{OrchestratorError, ReportError};
use crate::models::{AnalysisResult, Tier};
use crate::report::{self, ReportFormat, Reporter};
use anyhow::Context;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Per-call options for [`Orchestrator::analyze_page`].
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Selector for the element tier.
    pub selector: Option<String>,
    /// Capture a screenshot before analyzing.
    pub screenshot: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            selector: None,
            screenshot: true,
        }
    }
}

impl AnalyzeOptions {
    pub fn with_selector(selector: impl Into<String>) -> Self {
        Self {
            selector: Some(selector.into()),
            ..Self::default()
        }
    }
}

struct Session {
    browser: Arc<dyn Browser>,
    context: Arc<dyn BrowserContext>,
}

/// Drives page analyses from session start to report.
pub struct Orchestrator {
    config: Config,
    launcher: Arc<dyn BrowserLauncher>,
    runner: AnalyzerRunner,
    reporters: Vec<Arc<dyn Reporter>>,
    session: Mutex<Option<Session>>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        launcher: Arc<dyn BrowserLauncher>,
        analyzers: Vec<Arc<dyn Analyzer>>,
        reporters: Vec<Arc<dyn Reporter>>,
    ) -> Self {
        let runner = AnalyzerRunner::new(analyzers, config.browser.clone());
        Self {
            config,
            launcher,
            runner,
            reporters,
            session: Mutex::new(None),
        }
    }

    /// HTTP backend, every enabled analyzer and all report formats.
    pub fn with_defaults(config: Config) -> Self {
        let launcher = Arc::new(HttpLauncher::new(config.browser.clone()));
        let analyzers = analyzers::registry(&config);
        let reporters = report::default_reporters(config.report.max_issues_per_category);
        Self::new(config, launcher, analyzers, reporters)
    }

    /// Launches the browser session. A second call is a no-op.
    pub async fn initialize(&self) -> Result<(), OrchestratorError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            debug!("Orchestrator already initialized");
            return Ok(());
        }

        info!("Launching browser session");
        let browser = self.launcher.launch().await?;
        let context = match browser
            .new_context(ContextConfig::desktop(&self.config.browser))
            .await
        {
            Ok(context) => context,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!("Failed to close browser after context failure: {}", close_err);
                }
                return Err(e.into());
            }
        };

        *session = Some(Session { browser, context });
        Ok(())
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.browser.timeout_seconds)
    }

    /// Runs `tier` against `url` and returns the finalized result.
    ///
    /// Page failures are recorded in the result's `error`; the only error
    /// returned is [`OrchestratorError::NotInitialized`].
    pub async fn analyze_page(
        &self,
        url: &str,
        tier: Tier,
        options: &AnalyzeOptions,
    ) -> Result<AnalysisResult, OrchestratorError> {
        let (browser, context) = {
            let session = self.session.lock().await;
            let session = session.as_ref().ok_or(OrchestratorError::NotInitialized)?;
            (Arc::clone(&session.browser), Arc::clone(&session.context))
        };

        info!("Starting {} analysis of {}", tier, url);
        let mut agg = Aggregator::new(url, tier);

        let page = match context.new_page().await {
            Ok(page) => page,
            Err(e) => {
                warn!("Could not open a page: {}", e);
                agg.set_error(e.to_string());
                return Ok(agg.finish());
            }
        };

        self.run_on_page(page.as_ref(), browser.as_ref(), url, tier, options, &mut agg)
            .await;

        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }

        let result = agg.finish();
        info!(
            "Finished {} analysis of {}: {} issue(s) in {}ms",
            tier,
            url,
            result.issues.len(),
            result.elapsed_ms
        );
        Ok(result)
    }

    async fn run_on_page(
        &self,
        page: &dyn Page,
        browser: &dyn Browser,
        url: &str,
        tier: Tier,
        options: &AnalyzeOptions,
        agg: &mut Aggregator,
    ) {
        if let Err(e) = page.goto(url, self.timeout()).await {
            warn!("Navigation failed: {}", e);
            agg.set_error(e.to_string());
            return;
        }

        if options.screenshot && self.config.analysis.screenshots {
            match self.capture_screenshot(page, tier).await {
                Ok(path) => agg.add_screenshot(path),
                Err(e) => warn!("Skipping screenshot: {:#}", e),
            }
        }

        self.runner
            .run_tier(
                TierRequest {
                    tier,
                    url,
                    page,
                    browser,
                    selector: options.selector.as_deref(),
                },
                agg,
            )
            .await;
    }

    async fn capture_screenshot(&self, page: &dyn Page, tier: Tier) -> anyhow::Result<PathBuf> {
        let png = page.screenshot().await?;

        let dir = Path::new(&self.config.output_dir).join("screenshots");
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let stem = format!(
            "screenshot-{}-{}",
            tier,
            Utc::now().format("%Y%m%d-%H%M%S%3f")
        );
        let path = report::write_unique(&dir, &stem, "png", &png).await?;
        debug!("Saved screenshot to {}", path.display());
        Ok(path)
    }

    /// Releases the browser session. Safe to call more than once.
    pub async fn close(&self) -> Result<(), OrchestratorError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };

        info!("Closing browser session");
        if let Err(e) = session.context.close().await {
            warn!("Failed to close browser context: {}", e);
        }
        session.browser.close().await?;
        Ok(())
    }

    /// Writes `result` with the reporter for `format` into `output_dir`.
    pub async fn generate_report(
        &self,
        result: &AnalysisResult,
        format: ReportFormat,
        output_dir: &Path,
    ) -> Result<PathBuf, ReportError> {
        let reporter = self
            .reporters
            .iter()
            .find(|r| r.format() == format)
            .ok_or_else(|| ReportError::UnknownFormat(format.to_string()))?;

        report::write_report(reporter.as_ref(), result, output_dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::Pass;
    use crate::error::BrowserError;
    use crate::models::Severity;
    use crate::report::JsonReporter;
    use crate::testing::{FakeLauncher, FakeState, StaticAnalyzer};
    use tempfile::TempDir;

    const URL: &str = "https://shop.test/";

    const PAGE: &str = r#"<html lang="en"><head><title>Shop</title>
        <meta name="viewport" content="width=device-width, initial-scale=1">
        </head><body>
        <h1>Shop</h1>
        <img src="hero.png">
        <form><input type="email" name="email"></form>
        </body></html>"#;

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.output_dir = dir.path().display().to_string();
        config
    }

    fn orchestrator(
        dir: &TempDir,
        launcher: FakeLauncher,
        analyzers: Vec<Arc<dyn Analyzer>>,
    ) -> (Orchestrator, Arc<FakeState>) {
        let state = launcher.state();
        let orchestrator = Orchestrator::new(
            config(dir),
            Arc::new(launcher),
            analyzers,
            vec![Arc::new(JsonReporter)],
        );
        (orchestrator, state)
    }

    #[tokio::test]
    async fn test_requires_initialize() {
        let dir = TempDir::new().unwrap();
        let (orchestrator, _) = orchestrator(&dir, FakeLauncher::new(), Vec::new());

        let err = orchestrator
            .analyze_page(URL, Tier::Quick, &AnalyzeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::NotInitialized));
    }

    #[tokio::test]
    async fn test_launch_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let (orchestrator, _) = orchestrator(&dir, FakeLauncher::new().failing_launch(), Vec::new());

        let err = orchestrator.initialize().await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Browser(BrowserError::Launch(_))
        ));
    }

    #[tokio::test]
    async fn test_initialize_twice_and_close_twice() {
        let dir = TempDir::new().unwrap();
        let (orchestrator, state) = orchestrator(&dir, FakeLauncher::new(), Vec::new());

        orchestrator.initialize().await.unwrap();
        orchestrator.initialize().await.unwrap();
        assert_eq!(state.launches(), 1);

        orchestrator.close().await.unwrap();
        orchestrator.close().await.unwrap();
        assert_eq!(state.browsers_closed(), 1);
        assert_eq!(state.contexts_closed(), 1);

        let err = orchestrator
            .analyze_page(URL, Tier::Quick, &AnalyzeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::NotInitialized));
    }

    #[tokio::test]
    async fn test_navigation_failure_is_recorded() {
        let dir = TempDir::new().unwrap();
        let analyzers: Vec<Arc<dyn Analyzer>> = vec![Arc::new(StaticAnalyzer::issue(
            "any",
            &[Pass::Quick],
            "should not run",
            Severity::High,
        ))];
        let (orchestrator, state) = orchestrator(&dir, FakeLauncher::new(), analyzers);
        orchestrator.initialize().await.unwrap();

        let result = orchestrator
            .analyze_page("https://unreachable.test/", Tier::Quick, &AnalyzeOptions::default())
            .await
            .unwrap();

        assert!(result.error.as_deref().unwrap().contains("unreachable.test"));
        assert!(result.issues.is_empty());
        assert!(result.screenshots.is_empty());
        assert_eq!(result.summary.as_ref().unwrap().overall_score, 100);
        assert_eq!(state.pages_opened(), 1);
        assert_eq!(state.pages_closed(), 1);
    }

    #[tokio::test]
    async fn test_failing_analyzer_yields_one_system_issue() {
        let dir = TempDir::new().unwrap();
        let analyzers: Vec<Arc<dyn Analyzer>> = vec![
            Arc::new(StaticAnalyzer::issue("a", &[Pass::Quick], "from a", Severity::Low)),
            Arc::new(StaticAnalyzer::failing("b", &[Pass::Quick])),
            Arc::new(StaticAnalyzer::issue("c", &[Pass::Quick], "from c", Severity::Low)),
        ];
        let (orchestrator, state) =
            orchestrator(&dir, FakeLauncher::new().with_page(URL, PAGE), analyzers);
        orchestrator.initialize().await.unwrap();

        let result = orchestrator
            .analyze_page(URL, Tier::Quick, &AnalyzeOptions::default())
            .await
            .unwrap();

        assert!(result.error.is_none());
        assert_eq!(result.issues.len(), 3);
        let system: Vec<_> = result
            .issues
            .iter()
            .filter(|i| i.category == "system")
            .collect();
        assert_eq!(system.len(), 1);
        assert_eq!(system[0].source, "b");
        assert_eq!(result.summary.as_ref().unwrap().total_issues, 3);
        assert_eq!(state.pages_closed(), 1);
    }

    #[tokio::test]
    async fn test_screenshot_written_under_output_dir() {
        let dir = TempDir::new().unwrap();
        let (orchestrator, _) =
            orchestrator(&dir, FakeLauncher::new().with_page(URL, PAGE), Vec::new());
        orchestrator.initialize().await.unwrap();

        let result = orchestrator
            .analyze_page(URL, Tier::Quick, &AnalyzeOptions::default())
            .await
            .unwrap();
        assert_eq!(result.screenshots.len(), 1);
        assert!(result.screenshots[0].starts_with(dir.path().join("screenshots")));
        assert!(result.screenshots[0].exists());

        let options = AnalyzeOptions {
            screenshot: false,
            ..AnalyzeOptions::default()
        };
        let result = orchestrator.analyze_page(URL, Tier::Quick, &options).await.unwrap();
        assert!(result.screenshots.is_empty());
    }

    #[tokio::test]
    async fn test_full_tier_with_real_analyzers() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let analyzers = analyzers::registry(&config);
        let (orchestrator, state) =
            orchestrator(&dir, FakeLauncher::new().with_page(URL, PAGE), analyzers);
        orchestrator.initialize().await.unwrap();

        let result = orchestrator
            .analyze_page(URL, Tier::Full, &AnalyzeOptions::default())
            .await
            .unwrap();

        assert!(result.error.is_none());
        assert!(result.has_critical_issues());
        assert!(result.scores.contains_key("accessibilityScore"));
        assert!(result.scores.contains_key("mobileScore"));
        assert!(result.metrics.contains_key("mobileViewportWidth"));
        assert!(state.saw_mobile_context());
        // the session context stays open; page and mobile context are released
        assert_eq!(state.contexts_closed(), 1);
        assert_eq!(state.pages_opened(), state.pages_closed());

        let summary = result.summary.as_ref().unwrap();
        assert_eq!(summary.total_issues, result.issues.len());
        assert!(summary.priority_actions.len() <= 3);
    }

    #[tokio::test]
    async fn test_generate_report() {
        let dir = TempDir::new().unwrap();
        let (orchestrator, _) = orchestrator(&dir, FakeLauncher::new(), Vec::new());
        let result = AnalysisResult::new(URL, Tier::Quick);

        let path = orchestrator
            .generate_report(&result, ReportFormat::Json, dir.path())
            .await
            .unwrap();
        assert!(path.exists());

        let err = orchestrator
            .generate_report(&result, ReportFormat::Html, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::UnknownFormat(_)));
    }
}
