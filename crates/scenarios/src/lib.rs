//! ProdFlow E2E Scenario Suite
//!
//! This crate binds the harness primitives to the ProdFlow ERP:
//! - Page objects for the orders, production, and warehouse surfaces
//! - A driver seam with a Playwright bridge and an in-memory simulation
//! - The chained scenario suite sharing one state across scenarios
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── run(cx: &mut SuiteCx) -> SuiteResult                 │
//! │    └── SuiteCx { state, soft, driver, api }                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pages                                                      │
//! │    ├── OrdersPage      create / search / archive sweep      │
//! │    ├── ProductionPage  launch with quantity-delta check     │
//! │    ├── WarehousePage   kitting via a second tab             │
//! │    └── SearchableTable TableSurface over any PageDriver     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageDriver                                                 │
//! │    ├── PlaywrightDriver  NDJSON bridge to a node child      │
//! │    └── SimDriver         in-memory ERP, fault injection     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod pages;
pub mod runner;
pub mod scenarios;
pub mod sim;

pub use config::{DriverKind, SuiteConfig};
pub use driver::{PageDriver, PlaywrightConfig, PlaywrightDriver};
pub use runner::{Scenario, ScenarioRunner, SuiteCx, SuiteResult};
pub use sim::{Faults, SimErp};
