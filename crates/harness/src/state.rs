//! Shared scenario state
//!
//! Values that cross the boundary between independently reported test
//! scenarios: the order number assigned by the ERP on save, the descendant
//! assembly/part lists parsed from the specification table, and scalar
//! trackers read from table cells. One `ScenarioState` instance lives for
//! one suite run and is passed `&mut` into each scenario in turn; it is
//! not shared between concurrently running suites.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};

/// An order as identified by the ERP after save
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderRef {
    /// Order number assigned by the system on save
    pub number: String,

    /// Order date as shown in the header, when the page exposes one
    pub date: Option<NaiveDate>,
}

/// One row of a product specification: a sub-assembly or a leaf part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecItem {
    pub name: String,
    pub designation: String,
    pub quantity: u32,
}

/// Cross-scenario mutable state for one suite run
///
/// Plain field writes are last-writer-wins. List fields are cleared before
/// being repopulated so an idempotent re-run of the producing scenario
/// never duplicates entries. The `require_*` accessors are how consumers
/// declare their dependencies: an unset or empty required field is a fatal
/// precondition failure naming the producing scenario, never a silently
/// skipped case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioState {
    /// First order of the chain; set once by the create-order scenario
    pub order: Option<OrderRef>,

    /// Second-order variant chain
    pub second_order: Option<OrderRef>,

    /// Sub-assemblies (cbed) parsed from the specification after save
    pub descendants_cbed: Vec<SpecItem>,

    /// Leaf parts (detail) parsed from the specification after save
    pub descendants_detail: Vec<SpecItem>,

    /// Quantity cell captured before the most recent mutating action
    pub quantity_before: String,

    /// Quantity cell captured after the action settled
    pub quantity_after: String,

    /// Urgency date read off the orders table for the tracked order
    pub urgency_date_on_table: String,
}

impl ScenarioState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tracked order, or a precondition failure naming the producer.
    pub fn require_order(&self) -> HarnessResult<&OrderRef> {
        self.order
            .as_ref()
            .ok_or_else(|| HarnessError::precondition("order", "create-order"))
    }

    pub fn require_second_order(&self) -> HarnessResult<&OrderRef> {
        self.second_order
            .as_ref()
            .ok_or_else(|| HarnessError::precondition("second_order", "create-second-order"))
    }

    /// Sub-assembly list; empty is as fatal as unset.
    pub fn require_cbed(&self) -> HarnessResult<&[SpecItem]> {
        if self.descendants_cbed.is_empty() {
            return Err(HarnessError::precondition(
                "descendants_cbed",
                "create-order",
            ));
        }
        Ok(&self.descendants_cbed)
    }

    /// Leaf part list; empty is as fatal as unset.
    pub fn require_detail(&self) -> HarnessResult<&[SpecItem]> {
        if self.descendants_detail.is_empty() {
            return Err(HarnessError::precondition(
                "descendants_detail",
                "create-order",
            ));
        }
        Ok(&self.descendants_detail)
    }

    /// Empty both descendant lists. Called at the top of an order-creation
    /// run, before repopulating, so repeated runs never append duplicates.
    pub fn clear_descendants(&mut self) {
        self.descendants_cbed.clear();
        self.descendants_detail.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, designation: &str, quantity: u32) -> SpecItem {
        SpecItem {
            name: name.to_string(),
            designation: designation.to_string(),
            quantity,
        }
    }

    #[test]
    fn unset_fields_have_zero_values() {
        let state = ScenarioState::new();
        assert!(state.order.is_none());
        assert_eq!(state.quantity_before, "");
        assert!(state.descendants_cbed.is_empty());
    }

    #[test]
    fn require_order_names_producer_scenario() {
        let state = ScenarioState::new();
        let err = state.require_order().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("order"), "message should name the field: {msg}");
        assert!(
            msg.contains("create-order"),
            "message should name the producing scenario: {msg}"
        );
    }

    #[test]
    fn empty_list_is_a_precondition_failure() {
        let state = ScenarioState::new();
        assert!(matches!(
            state.require_detail(),
            Err(HarnessError::Precondition { .. })
        ));
    }

    #[test]
    fn populated_list_passes_precondition() {
        let mut state = ScenarioState::new();
        state.descendants_cbed.push(item("Корпус", "0Т4.21", 2));
        assert_eq!(state.require_cbed().unwrap().len(), 1);
    }

    #[test]
    fn repopulation_with_clear_between_does_not_duplicate() {
        let mut state = ScenarioState::new();

        for _ in 0..2 {
            state.clear_descendants();
            state.descendants_cbed.push(item("Корпус", "0Т4.21", 2));
            state.descendants_detail.push(item("Ось", "0Т4.22", 4));
            state.descendants_detail.push(item("Винт", "0Т4.23", 8));
        }

        assert_eq!(state.descendants_cbed.len(), 1);
        assert_eq!(state.descendants_detail.len(), 2);
    }

    #[test]
    fn field_writes_are_last_writer_wins() {
        let mut state = ScenarioState::new();
        state.quantity_before = "2".to_string();
        state.quantity_before = "4".to_string();
        assert_eq!(state.quantity_before, "4");
    }
}
