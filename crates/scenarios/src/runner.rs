//! Scenario runner
//!
//! Executes the suite in its declared order. Scenarios share one
//! `ScenarioState` and one browser session, so order matters: later
//! scenarios consume what earlier ones produced. A failed scenario does
//! not stop the run; downstream scenarios that depended on its output
//! fail fast on their own precondition checks.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use prodflow_harness::{ApiClient, HarnessResult, ScenarioState, SoftAsserts};

use crate::config::SuiteConfig;
use crate::driver::PageDriver;

/// Everything a scenario gets to work with
pub struct SuiteCx {
    pub config: SuiteConfig,
    pub state: ScenarioState,
    pub soft: SoftAsserts,
    pub driver: Box<dyn PageDriver>,
    pub api: ApiClient,
}

impl SuiteCx {
    pub fn new(config: SuiteConfig, driver: Box<dyn PageDriver>) -> HarnessResult<Self> {
        let mut api = ApiClient::new(&config.api_url)?;
        if let Some(token) = &config.api_token {
            api = api.with_token(token);
        }
        Ok(Self {
            config,
            state: ScenarioState::default(),
            soft: SoftAsserts::new(),
            driver,
            api,
        })
    }
}

type ScenarioFn = Box<
    dyn for<'a> Fn(&'a mut SuiteCx) -> Pin<Box<dyn Future<Output = HarnessResult<()>> + Send + 'a>>
        + Send
        + Sync,
>;

/// One named scenario in the chain
pub struct Scenario {
    pub name: &'static str,
    pub tags: &'static [&'static str],
    run: ScenarioFn,
}

impl Scenario {
    pub fn new<F>(name: &'static str, tags: &'static [&'static str], f: F) -> Self
    where
        F: for<'a> Fn(
                &'a mut SuiteCx,
            ) -> Pin<Box<dyn Future<Output = HarnessResult<()>> + Send + 'a>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name,
            tags,
            run: Box::new(f),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }
}

/// Result of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub soft_mismatches: Vec<String>,
    pub error: Option<String>,
}

/// Result of the whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Runs scenarios in declaration order against one shared context
pub struct ScenarioRunner {
    scenarios: Vec<Scenario>,
}

impl ScenarioRunner {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    /// Keep only scenarios carrying `tag`. Order is preserved.
    pub fn retain_tagged(&mut self, tag: &str) {
        self.scenarios.retain(|s| s.has_tag(tag));
    }

    /// Keep only the scenario named `name`.
    pub fn retain_named(&mut self, name: &str) {
        self.scenarios.retain(|s| s.name == name);
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub async fn run(&self, cx: &mut SuiteCx) -> SuiteResult {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("running {} scenario(s)", self.scenarios.len());

        for scenario in &self.scenarios {
            let result = self.run_one(scenario, cx).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "suite finished: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        SuiteResult {
            total: self.scenarios.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    async fn run_one(&self, scenario: &Scenario, cx: &mut SuiteCx) -> ScenarioResult {
        let start = Instant::now();
        debug!(scenario = scenario.name, "starting");

        let outcome = (scenario.run)(cx).await;

        // Recorded mismatches fail the scenario even when it ran to the
        // end; they are reported together rather than one at a time.
        let mismatches = cx.soft.take();
        let soft_mismatches: Vec<String> =
            mismatches.iter().map(|m| m.to_string()).collect();

        let error = match outcome {
            Ok(()) if soft_mismatches.is_empty() => None,
            Ok(()) => Some(format!(
                "{} soft assertion(s) failed: {}",
                soft_mismatches.len(),
                soft_mismatches.join("; ")
            )),
            Err(e) => Some(e.to_string()),
        };

        if error.is_some() {
            if let Err(e) = cx
                .driver
                .screenshot(&format!("{}-failure", scenario.name))
                .await
            {
                debug!(scenario = scenario.name, "failure screenshot unavailable: {e}");
            }
        }

        ScenarioResult {
            name: scenario.name.to_string(),
            success: error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            soft_mismatches,
            error,
        }
    }
}

/// Write the suite result to `<output_dir>/test-results.json`.
pub fn write_results(output_dir: &PathBuf, result: &SuiteResult) -> HarnessResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(&path, json)?;
    info!("results written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimErp;
    use prodflow_harness::HarnessError;

    fn test_cx() -> SuiteCx {
        SuiteCx::new(SuiteConfig::default(), Box::new(SimErp::new().driver())).unwrap()
    }

    fn passing(name: &'static str) -> Scenario {
        Scenario::new(name, &[], |_cx| Box::pin(async { Ok(()) }))
    }

    #[tokio::test]
    async fn failure_does_not_stop_the_chain() {
        let runner = ScenarioRunner::new(vec![
            passing("first"),
            Scenario::new("second", &[], |_cx| {
                Box::pin(async { Err(HarnessError::ActionRejected("boom".to_string())) })
            }),
            passing("third"),
        ]);

        let mut cx = test_cx();
        let result = runner.run(&mut cx).await;
        assert_eq!(result.total, 3);
        assert_eq!(result.passed, 2);
        assert_eq!(result.failed, 1);
        assert!(!result.results[1].success);
        assert!(result.results[2].success);
    }

    #[tokio::test]
    async fn soft_mismatches_fail_a_completed_scenario() {
        let runner = ScenarioRunner::new(vec![Scenario::new("soft", &[], |cx| {
            Box::pin(async move {
                cx.soft.check_eq("номер заказа", "1500", "1501");
                cx.soft.check_eq("изделие", "Редуктор", "Редуктор");
                Ok(())
            })
        })]);

        let mut cx = test_cx();
        let result = runner.run(&mut cx).await;
        assert_eq!(result.failed, 1);
        assert_eq!(result.results[0].soft_mismatches.len(), 1);
        // The drained accumulator starts the next scenario clean.
        assert!(cx.soft.is_clean());
    }

    #[tokio::test]
    async fn tag_filter_preserves_order() {
        let mut runner = ScenarioRunner::new(vec![
            Scenario::new("a", &["ui"], |_cx| Box::pin(async { Ok(()) })),
            Scenario::new("b", &["api"], |_cx| Box::pin(async { Ok(()) })),
            Scenario::new("c", &["ui"], |_cx| Box::pin(async { Ok(()) })),
        ]);
        runner.retain_tagged("ui");

        let mut cx = test_cx();
        let result = runner.run(&mut cx).await;
        assert_eq!(result.total, 2);
        assert_eq!(result.results[0].name, "a");
        assert_eq!(result.results[1].name, "c");
    }
}
