//! Suite configuration
//!
//! Loaded from a YAML file, then overridden by `PRODFLOW_*` environment
//! variables. The defaults target the in-memory simulation so the suite
//! runs with no deployment at all.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use prodflow_harness::{HarnessError, HarnessResult};

use crate::pages::PageTimeouts;

/// Which driver backs the page objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// In-memory ERP simulation
    #[default]
    Sim,

    /// Playwright bridge against a real deployment
    Playwright,
}

/// Configuration for one suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Web UI base URL (playwright driver)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// REST API base URL (API scenarios)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token for authenticated API scenarios
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default)]
    pub driver: DriverKind,

    /// Directory for the JSON results report
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory for failure screenshots
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,

    /// Element wait budget, milliseconds
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,

    /// Busy/settle budget, milliseconds
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Bounded wait for optional confirmation prompts, milliseconds
    #[serde(default = "default_confirm_ms")]
    pub confirm_ms: u64,

    /// Poll interval, milliseconds
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,

    /// Consecutive equal row counts that mean "filter settled"
    #[serde(default = "default_stable_polls")]
    pub stable_polls: u32,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_api_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("test-results")
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("test-results/screenshots")
}

fn default_wait_ms() -> u64 {
    10_000
}

fn default_settle_ms() -> u64 {
    15_000
}

fn default_confirm_ms() -> u64 {
    2_000
}

fn default_poll_ms() -> u64 {
    100
}

fn default_stable_polls() -> u32 {
    3
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_url: default_api_url(),
            api_token: None,
            driver: DriverKind::Sim,
            output_dir: default_output_dir(),
            screenshot_dir: default_screenshot_dir(),
            wait_ms: default_wait_ms(),
            settle_ms: default_settle_ms(),
            confirm_ms: default_confirm_ms(),
            poll_ms: default_poll_ms(),
            stable_polls: default_stable_polls(),
        }
    }
}

impl SuiteConfig {
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| HarnessError::Driver(format!("config parse error: {e}")))
    }

    /// Apply `PRODFLOW_*` environment overrides on top of the loaded
    /// values.
    pub fn apply_env(mut self) -> Self {
        if let Ok(v) = std::env::var("PRODFLOW_BASE_URL") {
            self.base_url = v;
        }
        if let Ok(v) = std::env::var("PRODFLOW_API_URL") {
            self.api_url = v;
        }
        if let Ok(v) = std::env::var("PRODFLOW_API_TOKEN") {
            self.api_token = Some(v);
        }
        if let Ok(v) = std::env::var("PRODFLOW_DRIVER") {
            self.driver = match v.as_str() {
                "playwright" => DriverKind::Playwright,
                _ => DriverKind::Sim,
            };
        }
        self
    }

    /// Page-level wait budgets derived from the suite budgets. The sim
    /// answers instantly, so it gets the tight preset.
    pub fn page_timeouts(&self) -> PageTimeouts {
        match self.driver {
            DriverKind::Sim => PageTimeouts::fast(),
            DriverKind::Playwright => PageTimeouts {
                wait: Duration::from_millis(self.wait_ms),
                settle: Duration::from_millis(self.settle_ms),
                confirm: Duration::from_millis(self.confirm_ms),
                poll: Duration::from_millis(self.poll_ms),
                stable_polls: self.stable_polls,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_fills_defaults() {
        let config: SuiteConfig = serde_yaml::from_str("driver: playwright\n").unwrap();
        assert_eq!(config.driver, DriverKind::Playwright);
        assert_eq!(config.wait_ms, 10_000);
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn sim_driver_uses_fast_timeouts() {
        let config = SuiteConfig::default();
        assert!(config.page_timeouts().poll < Duration::from_millis(10));
    }
}
