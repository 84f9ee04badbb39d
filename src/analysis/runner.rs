//! Tier execution.
//!
//! A tier is a fixed sequence of analyzer batches. Each batch starts every
//! participating analyzer at once and settles all of them before the next
//! batch begins, so one failing analyzer never takes its siblings down.

use super::aggregator::Aggregator;
use crate::analyzers::{Analyzer, Pass};
use crate::browser::{Browser, BrowserContext, ContextConfig, Page};
use crate::config::BrowserConfig;
use crate::error::{AnalyzerError, BrowserError};
use crate::models::{Fragment, Tier};
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source name of failures in the mobile-emulated context.
pub const MOBILE_CONTEXT: &str = "mobile-context";

/// The settled result of one analyzer in a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub analyzer: String,
    pub result: Result<Fragment, AnalyzerError>,
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs every analyzer that supports `pass` concurrently and waits for
/// all of them. Outcomes come back in registration order.
pub async fn run_batch(
    analyzers: &[Arc<dyn Analyzer>],
    page: &dyn Page,
    pass: &Pass,
) -> Vec<BatchOutcome> {
    let tasks = analyzers
        .iter()
        .filter(|analyzer| analyzer.supports(pass))
        .map(|analyzer| async move {
            let name = analyzer.name().to_string();
            debug!("Running {} ({} pass)", name, pass);

            let result = AssertUnwindSafe(analyzer.analyze(page, pass))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(AnalyzerError::Panicked(panic_message(panic.as_ref()))));

            BatchOutcome {
                analyzer: name,
                result,
            }
        });

    join_all(tasks).await
}

/// What a tier runs against.
pub struct TierRequest<'a> {
    pub tier: Tier,
    pub url: &'a str,
    /// The already loaded desktop page.
    pub page: &'a dyn Page,
    /// Session used to open the mobile context of the full tier.
    pub browser: &'a dyn Browser,
    pub selector: Option<&'a str>,
}

/// Runs analyzer batches for a tier.
pub struct AnalyzerRunner {
    analyzers: Vec<Arc<dyn Analyzer>>,
    browser_config: BrowserConfig,
}

impl AnalyzerRunner {
    pub fn new(analyzers: Vec<Arc<dyn Analyzer>>, browser_config: BrowserConfig) -> Self {
        Self {
            analyzers,
            browser_config,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.browser_config.timeout_seconds)
    }

    /// Runs one batch and merges it.
    async fn run_pass(&self, page: &dyn Page, pass: &Pass, agg: &mut Aggregator) {
        let outcomes = run_batch(&self.analyzers, page, pass).await;
        info!("{} pass settled: {} analyzer(s)", pass, outcomes.len());
        agg.absorb(outcomes);
    }

    /// Runs every batch of `request.tier` and merges the outcomes into `agg`.
    pub async fn run_tier(&self, request: TierRequest<'_>, agg: &mut Aggregator) {
        let page = request.page;

        match request.tier {
            Tier::Quick => {
                self.run_pass(page, &Pass::Quick, agg).await;
            }
            Tier::Deep => {
                self.run_pass(page, &Pass::Quick, agg).await;
                self.run_pass(page, &Pass::Extended, agg).await;
            }
            Tier::Element => match request.selector {
                Some(selector) => {
                    let pass = Pass::Element {
                        selector: selector.to_string(),
                    };
                    self.run_pass(page, &pass, agg).await;
                }
                None => {
                    warn!("Element analysis without a selector; running quick checks instead");
                    self.run_pass(page, &Pass::Quick, agg).await;
                }
            },
            Tier::Full => {
                self.run_pass(page, &Pass::Quick, agg).await;
                self.run_pass(page, &Pass::Extended, agg).await;
                self.run_mobile_audit(request.browser, request.url, agg).await;
            }
        }
    }

    /// Loads `url` in a mobile-emulated context and runs the mobile pass.
    /// The context is closed on every path.
    async fn run_mobile_audit(&self, browser: &dyn Browser, url: &str, agg: &mut Aggregator) {
        let context = match browser
            .new_context(ContextConfig::mobile(&self.browser_config))
            .await
        {
            Ok(context) => context,
            Err(e) => {
                agg.record_failure(MOBILE_CONTEXT, e);
                return;
            }
        };

        let outcome = self.audit_in_context(context.as_ref(), url, agg).await;

        if let Err(e) = context.close().await {
            warn!("Failed to close mobile context: {}", e);
        }
        if let Err(e) = outcome {
            agg.record_failure(MOBILE_CONTEXT, e);
        }
    }

    async fn audit_in_context(
        &self,
        context: &dyn BrowserContext,
        url: &str,
        agg: &mut Aggregator,
    ) -> Result<(), BrowserError> {
        let page = context.new_page().await?;
        let loaded = page.goto(url, self.timeout()).await;

        if loaded.is_ok() {
            self.run_pass(page.as_ref(), &Pass::Mobile, agg).await;
        }

        if let Err(e) = page.close().await {
            warn!("Failed to close mobile page: {}", e);
        }
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SYSTEM_CATEGORY;
    use crate::testing::{FakeLauncher, StaticAnalyzer};
    use crate::browser::BrowserLauncher;
    use crate::models::Severity;

    const URL: &str = "https://shop.test/";

    fn analyzers() -> Vec<Arc<dyn Analyzer>> {
        vec![
            Arc::new(StaticAnalyzer::issue("first", &[Pass::Quick], "one", Severity::Low)),
            Arc::new(StaticAnalyzer::failing("broken", &[Pass::Quick])),
            Arc::new(StaticAnalyzer::panicking("panics", &[Pass::Quick])),
            Arc::new(StaticAnalyzer::issue(
                "last",
                &[Pass::Quick, Pass::Extended],
                "four",
                Severity::High,
            )),
        ]
    }

    async fn loaded_page(launcher: &FakeLauncher) -> (Arc<dyn Browser>, Box<dyn Page>) {
        let browser = launcher.launch().await.unwrap();
        let context = browser
            .new_context(ContextConfig::desktop(&BrowserConfig::default()))
            .await
            .unwrap();
        let page = context.new_page().await.unwrap();
        page.goto(URL, Duration::from_secs(5)).await.unwrap();
        (browser, page)
    }

    #[tokio::test]
    async fn test_batch_settles_all_in_order() {
        let launcher = FakeLauncher::new().with_page(URL, "<html></html>");
        let (_browser, page) = loaded_page(&launcher).await;

        let outcomes = run_batch(&analyzers(), page.as_ref(), &Pass::Quick).await;
        let names: Vec<&str> = outcomes.iter().map(|o| o.analyzer.as_str()).collect();

        assert_eq!(names, vec!["first", "broken", "panics", "last"]);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(AnalyzerError::Internal(_))));
        match &outcomes[2].result {
            Err(AnalyzerError::Panicked(message)) => assert!(message.contains("exploded")),
            other => panic!("expected a panic outcome, got {:?}", other),
        }
        assert!(outcomes[3].result.is_ok());
    }

    #[tokio::test]
    async fn test_batch_skips_unsupported_passes() {
        let launcher = FakeLauncher::new().with_page(URL, "<html></html>");
        let (_browser, page) = loaded_page(&launcher).await;

        let outcomes = run_batch(&analyzers(), page.as_ref(), &Pass::Extended).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].analyzer, "last");
    }

    #[tokio::test]
    async fn test_deep_tier_runs_both_batches() {
        let launcher = FakeLauncher::new().with_page(URL, "<html></html>");
        let (browser, page) = loaded_page(&launcher).await;
        let runner = AnalyzerRunner::new(analyzers(), BrowserConfig::default());

        let mut agg = Aggregator::new(URL, Tier::Deep);
        runner
            .run_tier(
                TierRequest {
                    tier: Tier::Deep,
                    url: URL,
                    page: page.as_ref(),
                    browser: browser.as_ref(),
                    selector: None,
                },
                &mut agg,
            )
            .await;

        let result = agg.finish();
        let titles: Vec<&str> = result.issues.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "one",
                "Analyzer broken failed",
                "Analyzer panics failed",
                "four",
                "four"
            ]
        );
        assert_eq!(
            result
                .issues
                .iter()
                .filter(|i| i.category == SYSTEM_CATEGORY)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_element_without_selector_degrades_to_quick() {
        let launcher = FakeLauncher::new().with_page(URL, "<html></html>");
        let (browser, page) = loaded_page(&launcher).await;
        let element = StaticAnalyzer::issue(
            "scoped",
            &[Pass::Element {
                selector: "#x".to_string(),
            }],
            "scoped issue",
            Severity::Low,
        );
        let quick = StaticAnalyzer::issue("fast", &[Pass::Quick], "quick issue", Severity::Low);
        let runner = AnalyzerRunner::new(
            vec![Arc::new(element), Arc::new(quick)],
            BrowserConfig::default(),
        );

        let mut agg = Aggregator::new(URL, Tier::Element);
        runner
            .run_tier(
                TierRequest {
                    tier: Tier::Element,
                    url: URL,
                    page: page.as_ref(),
                    browser: browser.as_ref(),
                    selector: None,
                },
                &mut agg,
            )
            .await;
        assert_eq!(agg.result().issues[0].title, "quick issue");

        let mut agg = Aggregator::new(URL, Tier::Element);
        runner
            .run_tier(
                TierRequest {
                    tier: Tier::Element,
                    url: URL,
                    page: page.as_ref(),
                    browser: browser.as_ref(),
                    selector: Some("#x"),
                },
                &mut agg,
            )
            .await;
        assert_eq!(agg.result().issues.len(), 1);
        assert_eq!(agg.result().issues[0].title, "scoped issue");
    }

    #[tokio::test]
    async fn test_full_tier_closes_mobile_context() {
        let launcher = FakeLauncher::new().with_page(URL, "<html></html>");
        let state = launcher.state();
        let (browser, page) = loaded_page(&launcher).await;
        let mobile = StaticAnalyzer::issue("phone", &[Pass::Mobile], "mobile issue", Severity::Medium);
        let runner = AnalyzerRunner::new(vec![Arc::new(mobile)], BrowserConfig::default());

        let mut agg = Aggregator::new(URL, Tier::Full);
        runner
            .run_tier(
                TierRequest {
                    tier: Tier::Full,
                    url: URL,
                    page: page.as_ref(),
                    browser: browser.as_ref(),
                    selector: None,
                },
                &mut agg,
            )
            .await;

        assert_eq!(agg.result().issues.len(), 1);
        assert_eq!(agg.result().issues[0].title, "mobile issue");
        assert_eq!(state.contexts_opened(), 2);
        assert_eq!(state.contexts_closed(), 1);
        // desktop page is still open, the mobile one is closed
        assert_eq!(state.pages_opened(), 2);
        assert_eq!(state.pages_closed(), 1);
        assert!(state.saw_mobile_context());
    }

    #[tokio::test]
    async fn test_full_tier_mobile_navigation_failure() {
        let launcher = FakeLauncher::new()
            .with_page(URL, "<html></html>")
            .fail_mobile_navigation();
        let state = launcher.state();
        let (browser, page) = loaded_page(&launcher).await;
        let mobile = StaticAnalyzer::issue("phone", &[Pass::Mobile], "mobile issue", Severity::Medium);
        let runner = AnalyzerRunner::new(vec![Arc::new(mobile)], BrowserConfig::default());

        let mut agg = Aggregator::new(URL, Tier::Full);
        runner
            .run_tier(
                TierRequest {
                    tier: Tier::Full,
                    url: URL,
                    page: page.as_ref(),
                    browser: browser.as_ref(),
                    selector: None,
                },
                &mut agg,
            )
            .await;

        let result = agg.finish();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].source, MOBILE_CONTEXT);
        assert_eq!(result.issues[0].category, SYSTEM_CATEGORY);
        assert!(result.error.is_none());
        assert_eq!(state.contexts_closed(), 1);
        assert_eq!(state.pages_closed(), 1);
    }
}
