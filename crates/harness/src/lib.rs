//! ProdFlow E2E Harness Core
//!
//! Driver-agnostic building blocks for the ProdFlow end-to-end suite:
//!
//! - `ScenarioState`: typed cross-scenario state, passed into each
//!   scenario, with fatal precondition checks for required fields
//! - `RowActionLoop`: the resilient search → select → act → confirm →
//!   settle → verify cycle over any `TableSurface`
//! - `await_condition` / `stable_count` / `Backoff`: explicit
//!   condition-based waits with bounded timeouts
//! - `SoftAsserts`: recorded-not-fatal value checks, reported together at
//!   scenario end
//! - `ApiClient`: raw HTTP assertions (2xx yields the body, anything else
//!   is an error carrying status and body)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    scenario (test case)                      │
//! │   reads/writes ScenarioState, drives page objects            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  RowActionLoop                                               │
//! │    Searching → Selecting → Acting → Confirming →             │
//! │    Settling → Verifying → (Searching | Done | Exhausted)     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  TableSurface (trait)                                        │
//! │    apply_filter / rows / select_row / await_action_ready /   │
//! │    invoke_action / confirm_if_prompted / settle              │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod error;
pub mod rowloop;
pub mod soft;
pub mod state;
pub mod table;
pub mod wait;

pub use api::ApiClient;
pub use error::{HarnessError, HarnessResult};
pub use rowloop::{ConvergenceGoal, LoopConfig, LoopReport, RowActionLoop};
pub use soft::{Mismatch, SoftAsserts};
pub use state::{OrderRef, ScenarioState, SpecItem};
pub use table::{ActionOutcome, RowFilter, RowSnapshot, RowsReading, TableSurface, TargetRule};
pub use wait::{await_condition, stable_count, Backoff};
