//! Resilient row-action loop
//!
//! The search → select → act → confirm → settle → verify cycle used for
//! every row-targeted table mutation (archive matching orders, launch into
//! production, complete a receipt). The loop keeps iterating until its
//! convergence goal holds or a hard iteration ceiling is hit, and treats
//! the UI's acknowledgment signals as unreliable relative to backend
//! state: an action whose success indicator could not be confirmed is
//! re-verified by searching again, not assumed failed.

use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::table::{ActionOutcome, RowFilter, RowSnapshot, TableSurface, TargetRule};

/// Terminal condition for the loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceGoal {
    /// No non-excluded row matches the search term any more
    ZeroMatches,

    /// Exactly this many non-excluded rows match
    MatchCount(usize),

    /// The target row's cell in `column` equals its pre-action value plus
    /// `expected` (which may be negative)
    QuantityDelta { column: usize, expected: i64 },
}

/// Loop tuning knobs
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Hard cap on iterations; exceeding it is a fatal error carrying the
    /// count and the search term
    pub max_iterations: u32,

    /// Which matching row the action targets
    pub target: TargetRule,

    /// Terminal condition
    pub goal: ConvergenceGoal,

    /// Row exclusion rules (aggregate sentinel, placeholder colspan)
    pub filter: RowFilter,
}

impl LoopConfig {
    pub fn new(goal: ConvergenceGoal) -> Self {
        Self {
            max_iterations: 100,
            target: TargetRule::Last,
            goal,
            filter: RowFilter::default(),
        }
    }

    pub fn target(mut self, target: TargetRule) -> Self {
        self.target = target;
        self
    }

    pub fn filter(mut self, filter: RowFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn max_iterations(mut self, ceiling: u32) -> Self {
        self.max_iterations = ceiling;
        self
    }
}

/// What the loop did before reaching its terminal state
#[derive(Debug, Clone)]
pub struct LoopReport {
    pub iterations: u32,
    pub actions_performed: u32,
    pub ambiguous_recoveries: u32,

    /// Target cell value captured before the first action (quantity goals)
    pub quantity_before: Option<String>,

    /// Target cell value at convergence (quantity goals)
    pub quantity_after: Option<String>,
}

/// An action whose acknowledgment is pending re-verification
struct PendingAmbiguous {
    target_cells: Vec<String>,
    note: String,
}

/// The loop itself; construct once per invocation site, run per term
pub struct RowActionLoop {
    config: LoopConfig,
}

impl RowActionLoop {
    pub fn new(config: LoopConfig) -> Self {
        Self { config }
    }

    /// Drive the surface until the goal holds or the ceiling is hit.
    pub async fn run<S: TableSurface>(
        &self,
        surface: &mut S,
        term: &str,
    ) -> HarnessResult<LoopReport> {
        let mut iterations = 0u32;
        let mut actions = 0u32;
        let mut ambiguous_recoveries = 0u32;
        let mut before: Option<i64> = None;
        let mut before_text: Option<String> = None;
        let mut after_text: Option<String> = None;
        let mut pending: Option<PendingAmbiguous> = None;

        loop {
            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err(HarnessError::ConvergenceExhausted {
                    iterations: self.config.max_iterations,
                    search_term: term.to_string(),
                });
            }

            // Searching: commit the filter and snapshot the settled rows.
            surface.apply_filter(term).await?;
            let reading = surface.rows().await?;
            let matches: Vec<RowSnapshot> = self
                .config
                .filter
                .matches(reading.rows(), term)
                .into_iter()
                .cloned()
                .collect();
            debug!(term, iteration = iterations, matches = matches.len(), "searched");

            // Resolve a pending ambiguous action against the fresh view.
            if let Some(p) = pending.take() {
                let target_gone = !matches.iter().any(|m| m.cells == p.target_cells);
                let goal_now_met =
                    self.goal_met(&matches, before, &mut after_text)?;
                if target_gone || goal_now_met {
                    info!(
                        term,
                        note = %p.note,
                        "unconfirmed action verified as applied"
                    );
                    actions += 1;
                    ambiguous_recoveries += 1;
                } else {
                    warn!(term, note = %p.note, "unconfirmed action had no effect; retrying");
                }
            }

            // Verifying: terminal check happens on the fresh snapshot.
            if self.goal_met(&matches, before, &mut after_text)? {
                info!(term, iterations, actions, "row-action loop converged");
                return Ok(LoopReport {
                    iterations,
                    actions_performed: actions,
                    ambiguous_recoveries,
                    quantity_before: before_text,
                    quantity_after: after_text,
                });
            }

            // Selecting: pick the target among the matches.
            let target = self.pick_target(&matches).ok_or_else(|| {
                HarnessError::StructuralAbsence(format!(
                    "no actionable row matching '{}' (iteration {}, {} match(es))",
                    term,
                    iterations,
                    matches.len()
                ))
            })?;

            // Quantity goals capture "before" from the target prior to the
            // first Acting phase.
            if let ConvergenceGoal::QuantityDelta { column, .. } = self.config.goal {
                if before.is_none() {
                    let text = target.cell(column).trim().to_string();
                    before = Some(parse_quantity(&text, term)?);
                    before_text = Some(text);
                }
            }

            // Acting: select, await enablement, invoke.
            let target = target.clone();
            surface.select_row(&target).await?;
            surface.await_action_ready().await?;
            let outcome = surface.invoke_action().await?;

            // Confirming: optional prompt, absence is fine.
            let prompted = surface.confirm_if_prompted().await?;
            if prompted {
                debug!(term, "confirmation prompt dismissed");
            }

            // Settling: busy indicator cleared, fetch quiesced.
            surface.settle().await?;

            match outcome {
                ActionOutcome::Succeeded => {
                    actions += 1;
                }
                ActionOutcome::Failed(reason) => {
                    return Err(HarnessError::ActionRejected(format!(
                        "action on row matching '{}' failed at iteration {}: {}",
                        term, iterations, reason
                    )));
                }
                ActionOutcome::Ambiguous(note) => {
                    pending = Some(PendingAmbiguous {
                        target_cells: target.cells.clone(),
                        note,
                    });
                }
            }
        }
    }

    /// Whether the goal holds for the current match set. For quantity
    /// goals this also refreshes the observed "after" text.
    fn goal_met(
        &self,
        matches: &[RowSnapshot],
        before: Option<i64>,
        after_text: &mut Option<String>,
    ) -> HarnessResult<bool> {
        match &self.config.goal {
            ConvergenceGoal::ZeroMatches => Ok(matches.is_empty()),
            ConvergenceGoal::MatchCount(n) => Ok(matches.len() == *n),
            ConvergenceGoal::QuantityDelta { column, expected } => {
                let Some(before) = before else {
                    // Nothing acted on yet; a zero delta is trivially met.
                    return Ok(*expected == 0 && !matches.is_empty());
                };
                let Some(target) = self.pick_target(matches) else {
                    return Ok(false);
                };
                let text = target.cell(*column).trim().to_string();
                let current: i64 = match text.parse() {
                    Ok(v) => v,
                    Err(_) => return Ok(false),
                };
                *after_text = Some(text);
                Ok(current == before + expected)
            }
        }
    }

    fn pick_target<'a>(&self, matches: &'a [RowSnapshot]) -> Option<&'a RowSnapshot> {
        match &self.config.target {
            TargetRule::First => matches.first(),
            TargetRule::Last => matches.last(),
            TargetRule::BySecondaryKey(key) => matches.iter().find(|m| m.contains(key)),
        }
    }
}

fn parse_quantity(text: &str, term: &str) -> HarnessResult<i64> {
    text.parse().map_err(|_| {
        HarnessError::StructuralAbsence(format!(
            "quantity cell for '{}' is not numeric: '{}'",
            term, text
        ))
    })
}
