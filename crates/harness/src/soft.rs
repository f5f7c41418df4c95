//! Soft assertions
//!
//! A mismatch is recorded and the scenario keeps running its remaining
//! steps; the accumulated mismatches are reported together at scenario
//! end. This separates "this one check failed" from "the scenario cannot
//! continue".

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};

/// One recorded soft-assertion mismatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mismatch {
    pub label: String,
    pub expected: String,
    pub actual: String,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: expected '{}', got '{}'",
            self.label, self.expected, self.actual
        )
    }
}

/// Accumulator for soft assertions within one scenario
#[derive(Debug, Default)]
pub struct SoftAsserts {
    mismatches: Vec<Mismatch>,
}

impl SoftAsserts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mismatch unless `expected == actual` after trimming.
    pub fn check_eq(&mut self, label: &str, expected: &str, actual: &str) {
        if expected.trim() != actual.trim() {
            self.mismatches.push(Mismatch {
                label: label.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
    }

    /// Compare quantities both as trimmed strings and numerically, so
    /// `" 4"` and `"4"` agree while `"4"` and `"04 pieces"` do not.
    pub fn check_quantity(&mut self, label: &str, expected: &str, actual: &str) {
        let as_strings = expected.trim() == actual.trim();
        let as_numbers = match (expected.trim().parse::<i64>(), actual.trim().parse::<i64>()) {
            (Ok(e), Ok(a)) => e == a,
            _ => false,
        };
        if !(as_strings && as_numbers) {
            self.mismatches.push(Mismatch {
                label: label.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
    }

    /// Record a mismatch when `condition` is false.
    pub fn check(&mut self, label: &str, condition: bool, detail: &str) {
        if !condition {
            self.mismatches.push(Mismatch {
                label: label.to_string(),
                expected: "true".to_string(),
                actual: detail.to_string(),
            });
        }
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    /// Drain the accumulator, leaving it ready for the next scenario.
    pub fn take(&mut self) -> Vec<Mismatch> {
        std::mem::take(&mut self.mismatches)
    }

    /// Convert the accumulation into one combined failure at scenario end.
    pub fn into_result(self) -> HarnessResult<()> {
        if self.mismatches.is_empty() {
            return Ok(());
        }
        let summary = self
            .mismatches
            .iter()
            .map(|m| format!("{}: expected '{}', got '{}'", m.label, m.expected, m.actual))
            .collect::<Vec<_>>()
            .join("; ");
        Err(HarnessError::ActionRejected(format!(
            "{} soft assertion(s) failed: {}",
            self.mismatches.len(),
            summary
        )))
    }
}
