//! Table surface abstraction
//!
//! The row-action loop is generic over a `TableSurface`: any searchable,
//! filterable table exposing text rows and one mutating action. Concrete
//! surfaces bind this to a browser page or to the in-memory simulation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HarnessResult;

/// One table row as text, as captured at a point in time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowSnapshot {
    /// Position within the table body at capture time
    pub index: usize,

    /// Cell texts, left to right
    pub cells: Vec<String>,

    /// Colspan of the first cell, when the markup sets one. Placeholder
    /// rows render a single full-width cell and carry the body's column
    /// count here.
    pub colspan: Option<u32>,
}

impl RowSnapshot {
    pub fn contains(&self, term: &str) -> bool {
        self.cells.iter().any(|c| c.contains(term))
    }

    /// Text of one cell, empty when the column does not exist.
    pub fn cell(&self, column: usize) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Caller-injected row exclusion capability
///
/// Aggregate/total rows (matched by a sentinel text fragment) and
/// structurally different placeholder rows (matched by a colspan value)
/// are never eligible as action targets or match candidates.
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    /// Text fragment marking an aggregate/total row
    pub aggregate_sentinel: Option<String>,

    /// Colspan value marking a full-width placeholder row
    pub placeholder_colspan: Option<u32>,
}

impl RowFilter {
    pub fn with_sentinel(sentinel: &str) -> Self {
        Self {
            aggregate_sentinel: Some(sentinel.to_string()),
            ..Default::default()
        }
    }

    pub fn placeholder_colspan(mut self, colspan: u32) -> Self {
        self.placeholder_colspan = Some(colspan);
        self
    }

    pub fn is_excluded(&self, row: &RowSnapshot) -> bool {
        if let Some(sentinel) = &self.aggregate_sentinel {
            if row.cells.iter().any(|c| c.contains(sentinel.as_str())) {
                return true;
            }
        }
        if let (Some(marker), Some(colspan)) = (self.placeholder_colspan, row.colspan) {
            if marker == colspan {
                return true;
            }
        }
        false
    }

    /// Non-excluded rows containing `term`, in table order.
    pub fn matches<'a>(&self, rows: &'a [RowSnapshot], term: &str) -> Vec<&'a RowSnapshot> {
        rows.iter()
            .filter(|r| !self.is_excluded(r) && r.contains(term))
            .collect()
    }
}

/// How the loop picks its action target among the matching rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRule {
    First,
    Last,
    /// Match whose cells also contain this secondary key
    BySecondaryKey(String),
}

/// Outcome of one mutating action against a row
///
/// `Ambiguous` means the surface could not confirm success (the usual
/// case: the action control's enabled state never flipped back). The loop
/// resolves it by re-verification instead of assuming failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded,
    Failed(String),
    Ambiguous(String),
}

/// The result-set reading distinguishing a rendered-but-empty body from a
/// table that never appeared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowsReading {
    /// Table rendered; these are its body rows (possibly none)
    Rows(Vec<RowSnapshot>),

    /// Table rendered and the body is in its known empty/hidden state
    Empty,
}

impl RowsReading {
    pub fn rows(&self) -> &[RowSnapshot] {
        match self {
            RowsReading::Rows(rows) => rows,
            RowsReading::Empty => &[],
        }
    }
}

/// A searchable table with one mutating action, as seen by the loop
///
/// Implementations must fail with `StructuralAbsence` from `rows` when the
/// table itself never rendered; only a table that passed its page-ready
/// probe may report `RowsReading::Empty`.
#[async_trait]
pub trait TableSurface: Send {
    /// Commit filter text (the surface presses Enter or equivalent),
    /// triggering the asynchronous refetch.
    async fn apply_filter(&mut self, term: &str) -> HarnessResult<()>;

    /// Snapshot the current body rows.
    async fn rows(&mut self) -> HarnessResult<RowsReading>;

    /// Select a row (click/checkbox) so the action control targets it.
    async fn select_row(&mut self, row: &RowSnapshot) -> HarnessResult<()>;

    /// Wait for the action control to become enabled; enablement can lag
    /// row selection.
    async fn await_action_ready(&mut self) -> HarnessResult<()>;

    /// Invoke the mutating action against the selected row.
    async fn invoke_action(&mut self) -> HarnessResult<ActionOutcome>;

    /// Detect and dismiss an optional confirmation prompt within a short
    /// bounded wait. Returns whether a prompt was present; absence is not
    /// an error.
    async fn confirm_if_prompted(&mut self) -> HarnessResult<bool>;

    /// Wait for the busy indicator to clear and the backing fetch to
    /// quiesce.
    async fn settle(&mut self) -> HarnessResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(index: usize, cells: &[&str]) -> RowSnapshot {
        RowSnapshot {
            index,
            cells: cells.iter().map(|c| c.to_string()).collect(),
            colspan: None,
        }
    }

    #[test]
    fn aggregate_row_is_excluded_by_sentinel() {
        let filter = RowFilter::with_sentinel("Итого");
        let rows = vec![
            row(0, &["Корпус", "0Т4.21", "2"]),
            row(1, &["Ось", "0Т4.22", "4"]),
            RowSnapshot {
                index: 2,
                cells: vec!["Итого".to_string(), "6".to_string()],
                colspan: None,
            },
        ];

        // Sentinel row contains no term but must never inflate the count
        // even when it does.
        assert_eq!(filter.matches(&rows, "0Т4").len(), 2);
        assert_eq!(filter.matches(&rows, "Итого").len(), 0);
    }

    #[test]
    fn placeholder_row_is_excluded_by_colspan() {
        let filter = RowFilter::default().placeholder_colspan(7);
        let placeholder = RowSnapshot {
            index: 0,
            cells: vec!["Нет данных".to_string()],
            colspan: Some(7),
        };
        assert!(filter.is_excluded(&placeholder));
        assert!(!filter.is_excluded(&row(1, &["Корпус"])));
    }

    #[test]
    fn match_count_is_m_not_m_plus_one() {
        // One aggregate row that happens to contain the search term plus
        // N data rows where M contain it: count must be M.
        let filter = RowFilter::with_sentinel("Итого");
        let rows = vec![
            row(0, &["Корпус", "0Т4.21", "2"]),
            row(1, &["Крышка", "0Т5.10", "1"]),
            RowSnapshot {
                index: 2,
                cells: vec!["Итого по 0Т4.21".to_string()],
                colspan: None,
            },
        ];
        assert_eq!(filter.matches(&rows, "0Т4.21").len(), 1);
    }

    #[test]
    fn cell_out_of_range_reads_empty() {
        let r = row(0, &["Корпус", "2"]);
        assert_eq!(r.cell(1), "2");
        assert_eq!(r.cell(5), "");
    }
}
