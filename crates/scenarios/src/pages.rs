//! Page objects for the ProdFlow ERP
//!
//! Selector constants, the generic searchable-table binding, and the
//! order/production/warehouse page objects. The table binding implements
//! the harness's `TableSurface` over any `PageDriver`, so the same page
//! objects drive a real browser and the in-memory simulation.

use std::time::Duration;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use prodflow_harness::{
    await_condition, stable_count, ActionOutcome, Backoff, ConvergenceGoal, HarnessError,
    HarnessResult, LoopConfig, LoopReport, OrderRef, RowActionLoop, RowFilter, RowSnapshot,
    RowsReading, ScenarioState, SpecItem, TableSurface, TargetRule,
};

use crate::driver::{wait_visible_or_attached, PageDriver, WaitState};

/// Application routes
pub mod paths {
    pub const ORDERS: &str = "/orders";
    pub const ORDER_NEW: &str = "/orders/new";
    pub const PRODUCTION: &str = "/production";
    pub const WAREHOUSE: &str = "/warehouse";
}

/// Stable data-testid selectors shared with the simulation
pub mod testid {
    pub const ORDERS_READY: &str = "[data-testid='orders-page']";
    pub const ORDERS_SEARCH: &str = "[data-testid='orders-search-input']";
    pub const ORDERS_ROW: &str = "[data-testid='orders-table'] tbody tr";
    pub const ORDERS_EMPTY: &str = "[data-testid='orders-table-empty']";
    pub const ORDERS_ARCHIVE_BTN: &str = "[data-testid='orders-archive-button']";

    pub const ORDER_FORM_READY: &str = "[data-testid='order-form']";
    pub const ORDER_NAME_INPUT: &str = "[data-testid='order-name-input']";
    pub const ORDER_URGENCY_INPUT: &str = "[data-testid='order-urgency-input']";
    pub const ORDER_SAVE_BTN: &str = "[data-testid='order-save-button']";
    pub const ORDER_NUMBER_HEADER: &str = "[data-testid='order-number-header']";
    pub const SPEC_CBED_ROW: &str = "[data-testid='spec-cbed-table'] tbody tr";
    pub const SPEC_DETAIL_ROW: &str = "[data-testid='spec-detail-table'] tbody tr";

    pub const PRODUCTION_READY: &str = "[data-testid='production-page']";
    pub const PRODUCTION_SEARCH: &str = "[data-testid='production-search-input']";
    pub const PRODUCTION_ROW: &str = "[data-testid='production-table'] tbody tr";
    pub const PRODUCTION_EMPTY: &str = "[data-testid='production-table-empty']";
    pub const PRODUCTION_LAUNCH_BTN: &str = "[data-testid='production-launch-button']";

    pub const WAREHOUSE_READY: &str = "[data-testid='warehouse-page']";
    pub const WAREHOUSE_SEARCH: &str = "[data-testid='warehouse-search-input']";
    pub const WAREHOUSE_ROW: &str = "[data-testid='warehouse-table'] tbody tr";
    pub const WAREHOUSE_EMPTY: &str = "[data-testid='warehouse-table-empty']";
    pub const WAREHOUSE_KIT_BTN: &str = "[data-testid='warehouse-kit-button']";

    pub const CONFIRM_BTN: &str = "[data-testid='confirm-dialog-accept']";
    pub const BUSY: &str = "[data-testid='busy-indicator']";
}

/// Aggregate/total row sentinel used across the ERP's tables
pub const TOTAL_ROW_SENTINEL: &str = "Итого";

/// Kitting status shown once a warehouse position is complete
pub const KITTED_STATUS: &str = "Скомплектован";

/// Orders table columns
pub mod orders_col {
    pub const NUMBER: usize = 0;
    pub const NAME: usize = 1;
    pub const URGENCY: usize = 2;
}

/// Production and specification table columns
pub mod prod_col {
    pub const NAME: usize = 0;
    pub const DESIGNATION: usize = 1;
    pub const QUANTITY: usize = 2;
}

/// Warehouse table columns
pub mod wh_col {
    pub const DESIGNATION: usize = 0;
    pub const STATUS: usize = 1;
    pub const QUANTITY: usize = 2;
}

/// Wait budgets for page interactions
#[derive(Debug, Clone)]
pub struct PageTimeouts {
    pub wait: Duration,
    pub settle: Duration,
    pub confirm: Duration,
    pub poll: Duration,
    pub stable_polls: u32,
}

impl Default for PageTimeouts {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(10),
            settle: Duration::from_secs(15),
            confirm: Duration::from_secs(2),
            poll: Duration::from_millis(100),
            stable_polls: 3,
        }
    }
}

impl PageTimeouts {
    /// Tight budgets for the in-memory simulation, which answers every
    /// query instantly.
    pub fn fast() -> Self {
        Self {
            wait: Duration::from_millis(250),
            settle: Duration::from_millis(250),
            confirm: Duration::from_millis(50),
            poll: Duration::from_millis(1),
            stable_polls: 2,
        }
    }
}

/// Selector bundle binding one searchable table
#[derive(Debug, Clone)]
pub struct TableLocators {
    pub ready_marker: &'static str,
    pub search_input: &'static str,
    pub row: &'static str,
    pub empty_marker: &'static str,
    pub action_button: &'static str,
}

impl TableLocators {
    pub fn orders() -> Self {
        Self {
            ready_marker: testid::ORDERS_READY,
            search_input: testid::ORDERS_SEARCH,
            row: testid::ORDERS_ROW,
            empty_marker: testid::ORDERS_EMPTY,
            action_button: testid::ORDERS_ARCHIVE_BTN,
        }
    }

    pub fn production() -> Self {
        Self {
            ready_marker: testid::PRODUCTION_READY,
            search_input: testid::PRODUCTION_SEARCH,
            row: testid::PRODUCTION_ROW,
            empty_marker: testid::PRODUCTION_EMPTY,
            action_button: testid::PRODUCTION_LAUNCH_BTN,
        }
    }

    pub fn warehouse() -> Self {
        Self {
            ready_marker: testid::WAREHOUSE_READY,
            search_input: testid::WAREHOUSE_SEARCH,
            row: testid::WAREHOUSE_ROW,
            empty_marker: testid::WAREHOUSE_EMPTY,
            action_button: testid::WAREHOUSE_KIT_BTN,
        }
    }
}

/// `TableSurface` over a `PageDriver` and a locator bundle
pub struct SearchableTable<'d, D: PageDriver + ?Sized> {
    driver: &'d mut D,
    locators: TableLocators,
    timeouts: PageTimeouts,
    ready_probed: bool,
}

impl<'d, D: PageDriver + ?Sized> SearchableTable<'d, D> {
    pub fn new(driver: &'d mut D, locators: TableLocators, timeouts: PageTimeouts) -> Self {
        Self {
            driver,
            locators,
            timeouts,
            ready_probed: false,
        }
    }

    /// A hidden body only means "zero rows" once the page itself has
    /// rendered; before that it means the page failed to come up.
    async fn probe_ready(&mut self) -> HarnessResult<()> {
        if self.ready_probed {
            return Ok(());
        }
        wait_visible_or_attached(self.driver, self.locators.ready_marker, self.timeouts.wait)
            .await?;
        self.ready_probed = true;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<'d, D: PageDriver + ?Sized> TableSurface for SearchableTable<'d, D> {
    async fn apply_filter(&mut self, term: &str) -> HarnessResult<()> {
        self.probe_ready().await?;
        self.driver.fill(self.locators.search_input, term).await?;
        self.driver.press(self.locators.search_input, "Enter").await
    }

    async fn rows(&mut self) -> HarnessResult<RowsReading> {
        self.probe_ready().await?;

        // Known empty/hidden marker short-circuits the count polling.
        if self
            .driver
            .wait_for(self.locators.empty_marker, WaitState::Visible, self.timeouts.confirm)
            .await?
        {
            return Ok(RowsReading::Empty);
        }

        let row_selector = self.locators.row;
        {
            // Row count is the convergence signal of the refetch.
            let sampler = tokio::sync::Mutex::new(&mut *self.driver);
            let sampler = &sampler;
            stable_count(
                row_selector,
                self.timeouts.wait,
                self.timeouts.poll,
                self.timeouts.stable_polls,
                move || async move { sampler.lock().await.count(row_selector).await },
            )
            .await?;
        }

        Ok(RowsReading::Rows(self.driver.table_rows(row_selector).await?))
    }

    async fn select_row(&mut self, row: &RowSnapshot) -> HarnessResult<()> {
        self.driver.click_nth(self.locators.row, row.index).await
    }

    async fn await_action_ready(&mut self) -> HarnessResult<()> {
        let button = self.locators.action_button;
        let driver = tokio::sync::Mutex::new(&mut *self.driver);
        let driver = &driver;
        await_condition(
            "action control enabled",
            self.timeouts.wait,
            self.timeouts.poll,
            move || async move {
                let class = driver.lock().await.attr(button, "class").await?;
                Ok(!class.unwrap_or_default().contains("disabled"))
            },
        )
        .await
        .map_err(|e| match e {
            // Only an exhausted wait means "still disabled"; a failing
            // driver propagates as what it is.
            HarnessError::WaitTimeout { .. } => HarnessError::ActionRejected(format!(
                "action control '{button}' still disabled after retries"
            )),
            other => other,
        })
    }

    async fn invoke_action(&mut self) -> HarnessResult<ActionOutcome> {
        let button = self.locators.action_button;
        self.driver.click(button).await?;

        // The acknowledgment channel is best-effort: a missing ack is not
        // a failure, it hands the decision to re-verification.
        let driver = tokio::sync::Mutex::new(&mut *self.driver);
        let ack = std::sync::Mutex::new(None::<String>);
        let waited = {
            let driver = &driver;
            let ack = &ack;
            await_condition(
                "action acknowledgment",
                self.timeouts.confirm,
                self.timeouts.poll,
                move || async move {
                    let value = driver.lock().await.attr(button, "data-ack").await?;
                    match value {
                        Some(v) if !v.is_empty() => {
                            *ack.lock().unwrap_or_else(|e| e.into_inner()) = Some(v);
                            Ok(true)
                        }
                        _ => Ok(false),
                    }
                },
            )
            .await
        };

        match waited {
            Ok(()) => match ack.into_inner().unwrap_or_else(|e| e.into_inner()) {
                Some(v) if v == "ok" => Ok(ActionOutcome::Succeeded),
                Some(v) if v.starts_with("error:") => Ok(ActionOutcome::Failed(
                    v.trim_start_matches("error:").trim().to_string(),
                )),
                Some(v) => Ok(ActionOutcome::Ambiguous(format!("unknown ack '{v}'"))),
                None => Ok(ActionOutcome::Ambiguous(
                    "action control gave no acknowledgment".to_string(),
                )),
            },
            // A silent control is ambiguity for re-verification to settle;
            // a failing driver is not.
            Err(HarnessError::WaitTimeout { .. }) => Ok(ActionOutcome::Ambiguous(
                "action control gave no acknowledgment".to_string(),
            )),
            Err(e) => Err(e),
        }
    }

    async fn confirm_if_prompted(&mut self) -> HarnessResult<bool> {
        let present = self
            .driver
            .wait_for(testid::CONFIRM_BTN, WaitState::Visible, self.timeouts.confirm)
            .await?;
        if present {
            self.driver.click(testid::CONFIRM_BTN).await?;
        }
        Ok(present)
    }

    async fn settle(&mut self) -> HarnessResult<()> {
        let cleared = self
            .driver
            .wait_for(testid::BUSY, WaitState::Hidden, self.timeouts.settle)
            .await?;
        if !cleared {
            return Err(HarnessError::StructuralAbsence(format!(
                "busy indicator never cleared within {} ms",
                self.timeouts.settle.as_millis()
            )));
        }
        Ok(())
    }
}

/// Row exclusion shared by all ERP tables: total rows plus the
/// single-cell placeholder the grid renders while empty.
pub fn erp_row_filter() -> RowFilter {
    RowFilter::with_sentinel(TOTAL_ROW_SENTINEL).placeholder_colspan(7)
}

/// Orders list and order form
pub struct OrdersPage<'d, D: PageDriver + ?Sized> {
    driver: &'d mut D,
    timeouts: PageTimeouts,
}

impl<'d, D: PageDriver + ?Sized> OrdersPage<'d, D> {
    pub fn new(driver: &'d mut D, timeouts: PageTimeouts) -> Self {
        Self { driver, timeouts }
    }

    /// Create an order and return the reference the system assigned on
    /// save. The order number is only known after this point.
    pub async fn create_order(
        &mut self,
        product: &str,
        urgency: NaiveDate,
    ) -> HarnessResult<OrderRef> {
        self.driver.goto(paths::ORDER_NEW).await?;
        wait_visible_or_attached(self.driver, testid::ORDER_FORM_READY, self.timeouts.wait).await?;

        self.driver.fill(testid::ORDER_NAME_INPUT, product).await?;
        self.driver
            .fill(
                testid::ORDER_URGENCY_INPUT,
                &urgency.format("%d.%m.%Y").to_string(),
            )
            .await?;
        self.driver.click(testid::ORDER_SAVE_BTN).await?;

        wait_visible_or_attached(self.driver, testid::ORDER_NUMBER_HEADER, self.timeouts.wait)
            .await?;
        let headers = self.driver.texts(testid::ORDER_NUMBER_HEADER).await?;
        let header = headers.first().ok_or_else(|| {
            HarnessError::StructuralAbsence("order header rendered without text".to_string())
        })?;
        let order = parse_order_header(header)?;
        debug!(number = %order.number, "order saved");
        Ok(order)
    }

    /// Parse the specification tables under the saved order into the
    /// shared state. Lists are cleared first so re-runs never duplicate.
    pub async fn read_specification(&mut self, state: &mut ScenarioState) -> HarnessResult<()> {
        state.clear_descendants();
        let filter = erp_row_filter();

        for row in self.driver.table_rows(testid::SPEC_CBED_ROW).await? {
            if !filter.is_excluded(&row) {
                state.descendants_cbed.push(spec_item_from_row(&row)?);
            }
        }
        for row in self.driver.table_rows(testid::SPEC_DETAIL_ROW).await? {
            if !filter.is_excluded(&row) {
                state.descendants_detail.push(spec_item_from_row(&row)?);
            }
        }
        Ok(())
    }

    /// Search the orders table for `number` and return its urgency cell.
    pub async fn urgency_date_of(&mut self, number: &str) -> HarnessResult<String> {
        self.driver.goto(paths::ORDERS).await?;
        let mut table =
            SearchableTable::new(&mut *self.driver, TableLocators::orders(), self.timeouts.clone());
        table.apply_filter(number).await?;
        let reading = table.rows().await?;
        let filter = erp_row_filter();
        let matches = filter.matches(reading.rows(), number);
        let row = matches.first().ok_or_else(|| {
            HarnessError::StructuralAbsence(format!("order '{number}' not found in orders table"))
        })?;
        Ok(row.cell(orders_col::URGENCY).to_string())
    }

    /// Archive every order matching `term` with the resilient loop.
    pub async fn archive_all(&mut self, term: &str) -> HarnessResult<LoopReport> {
        self.driver.goto(paths::ORDERS).await?;
        let mut table =
            SearchableTable::new(&mut *self.driver, TableLocators::orders(), self.timeouts.clone());
        RowActionLoop::new(
            LoopConfig::new(ConvergenceGoal::ZeroMatches)
                .target(TargetRule::Last)
                .filter(erp_row_filter()),
        )
        .run(&mut table, term)
        .await
    }
}

/// Production launches
pub struct ProductionPage<'d, D: PageDriver + ?Sized> {
    driver: &'d mut D,
    timeouts: PageTimeouts,
}

impl<'d, D: PageDriver + ?Sized> ProductionPage<'d, D> {
    pub fn new(driver: &'d mut D, timeouts: PageTimeouts) -> Self {
        Self { driver, timeouts }
    }

    /// Launch one specification item into production and verify its
    /// quantity grew by exactly `expected`.
    pub async fn launch(&mut self, item: &SpecItem, expected: i64) -> HarnessResult<LoopReport> {
        self.driver.goto(paths::PRODUCTION).await?;
        let mut table = SearchableTable::new(
            &mut *self.driver,
            TableLocators::production(),
            self.timeouts.clone(),
        );
        RowActionLoop::new(
            LoopConfig::new(ConvergenceGoal::QuantityDelta {
                column: prod_col::QUANTITY,
                expected,
            })
            .target(TargetRule::BySecondaryKey(item.designation.clone()))
            .filter(erp_row_filter()),
        )
        .run(&mut table, &item.designation)
        .await
    }
}

/// Warehouse receipts and kitting
pub struct WarehousePage<'d, D: PageDriver + ?Sized> {
    driver: &'d mut D,
    timeouts: PageTimeouts,
}

impl<'d, D: PageDriver + ?Sized> WarehousePage<'d, D> {
    pub fn new(driver: &'d mut D, timeouts: PageTimeouts) -> Self {
        Self { driver, timeouts }
    }

    /// Current status cell for a designation.
    pub async fn status_of(&mut self, designation: &str) -> HarnessResult<String> {
        self.driver.goto(paths::WAREHOUSE).await?;
        let mut table = SearchableTable::new(
            &mut *self.driver,
            TableLocators::warehouse(),
            self.timeouts.clone(),
        );
        table.apply_filter(designation).await?;
        let reading = table.rows().await?;
        let filter = erp_row_filter();
        let matches = filter.matches(reading.rows(), designation);
        let row = matches.first().ok_or_else(|| {
            HarnessError::StructuralAbsence(format!(
                "warehouse position '{designation}' not found"
            ))
        })?;
        Ok(row.cell(wh_col::STATUS).to_string())
    }

    /// Complete kitting for a designation from a second tab, then poll
    /// from the primary tab until the status change becomes observable.
    /// The tabs share no state; coordination is the primary re-reading
    /// its own view with bounded backoff.
    pub async fn complete_kitting_via_secondary(
        &mut self,
        designation: &str,
    ) -> HarnessResult<()> {
        {
            let mut secondary = self.driver.open_secondary().await?;
            secondary.goto(paths::WAREHOUSE).await?;
            let mut table = SearchableTable::new(
                secondary.as_mut(),
                TableLocators::warehouse(),
                self.timeouts.clone(),
            );
            table.apply_filter(designation).await?;
            let reading = table.rows().await?;
            let filter = erp_row_filter();
            let target = filter
                .matches(reading.rows(), designation)
                .first()
                .map(|r| (*r).clone())
                .ok_or_else(|| {
                    HarnessError::StructuralAbsence(format!(
                        "warehouse position '{designation}' not found in secondary tab"
                    ))
                })?;
            table.select_row(&target).await?;
            table.await_action_ready().await?;
            let outcome = table.invoke_action().await?;
            table.confirm_if_prompted().await?;
            table.settle().await?;
            if let ActionOutcome::Failed(reason) = outcome {
                return Err(HarnessError::ActionRejected(format!(
                    "kitting of '{designation}' failed: {reason}"
                )));
            }
        }

        let mut backoff = Backoff::default();
        loop {
            if self.status_of(designation).await? == KITTED_STATUS {
                return Ok(());
            }
            match backoff.next_delay() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => {
                    return Err(HarnessError::WaitTimeout {
                        what: format!("kitting of '{designation}' to become observable"),
                        waited_ms: backoff.spent().as_millis() as u64,
                    })
                }
            }
        }
    }
}

/// Extract the assigned order number (and date, when shown) from the
/// order header, e.g. `Заказ № 1500 от 30.08.2026`.
pub fn parse_order_header(header: &str) -> HarnessResult<OrderRef> {
    let re = Regex::new(r"№\s*(\d+)(?:\s+от\s+(\d{2}\.\d{2}\.\d{4}))?")
        .map_err(|e| HarnessError::Driver(e.to_string()))?;
    let caps = re.captures(header).ok_or_else(|| {
        HarnessError::StructuralAbsence(format!("order header has no number: '{header}'"))
    })?;
    let number = caps[1].to_string();
    let date = caps
        .get(2)
        .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%d.%m.%Y").ok());
    Ok(OrderRef { number, date })
}

fn spec_item_from_row(row: &RowSnapshot) -> HarnessResult<SpecItem> {
    let quantity: u32 = row.cell(prod_col::QUANTITY).trim().parse().map_err(|_| {
        HarnessError::StructuralAbsence(format!(
            "specification row '{}' has a non-numeric quantity '{}'",
            row.cell(prod_col::NAME),
            row.cell(prod_col::QUANTITY)
        ))
    })?;
    Ok(SpecItem {
        name: row.cell(prod_col::NAME).to_string(),
        designation: row.cell(prod_col::DESIGNATION).to_string(),
        quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimErp;
    use std::path::PathBuf;

    /// Driver whose transport is gone; every call fails the same way.
    struct BrokenTransport;

    macro_rules! broken {
        () => {
            Err(HarnessError::Driver("bridge closed its stdout".to_string()))
        };
    }

    #[async_trait::async_trait]
    impl PageDriver for BrokenTransport {
        async fn goto(&mut self, _path: &str) -> HarnessResult<()> {
            broken!()
        }
        async fn fill(&mut self, _selector: &str, _value: &str) -> HarnessResult<()> {
            broken!()
        }
        async fn press(&mut self, _selector: &str, _key: &str) -> HarnessResult<()> {
            broken!()
        }
        async fn click(&mut self, _selector: &str) -> HarnessResult<()> {
            broken!()
        }
        async fn click_nth(&mut self, _selector: &str, _index: usize) -> HarnessResult<()> {
            broken!()
        }
        async fn texts(&mut self, _selector: &str) -> HarnessResult<Vec<String>> {
            broken!()
        }
        async fn attr(&mut self, _selector: &str, _name: &str) -> HarnessResult<Option<String>> {
            broken!()
        }
        async fn count(&mut self, _selector: &str) -> HarnessResult<usize> {
            broken!()
        }
        async fn table_rows(&mut self, _row_selector: &str) -> HarnessResult<Vec<RowSnapshot>> {
            broken!()
        }
        async fn wait_for(
            &mut self,
            _selector: &str,
            _state: WaitState,
            _timeout: Duration,
        ) -> HarnessResult<bool> {
            broken!()
        }
        async fn screenshot(&mut self, _name: &str) -> HarnessResult<Option<PathBuf>> {
            broken!()
        }
        async fn open_secondary(&mut self) -> HarnessResult<Box<dyn PageDriver>> {
            broken!()
        }
    }

    #[tokio::test]
    async fn unrendered_page_reads_as_structural_not_zero_rows() {
        let erp = SimErp::new();
        erp.seed_order("Редуктор", "01.09.2026").await;
        let mut driver = erp.driver();

        // No navigation: the orders page never came up.
        let mut table =
            SearchableTable::new(&mut driver, TableLocators::orders(), PageTimeouts::fast());
        let err = table.rows().await.unwrap_err();
        assert!(matches!(err, HarnessError::StructuralAbsence(_)));
    }

    #[tokio::test]
    async fn row_loop_on_an_unrendered_page_fails_structurally() {
        let erp = SimErp::new();
        let mut driver = erp.driver();

        let mut table =
            SearchableTable::new(&mut driver, TableLocators::orders(), PageTimeouts::fast());
        let err = RowActionLoop::new(
            LoopConfig::new(ConvergenceGoal::ZeroMatches).filter(erp_row_filter()),
        )
        .run(&mut table, "Списанный")
        .await
        .unwrap_err();
        assert!(matches!(err, HarnessError::StructuralAbsence(_)));
    }

    #[tokio::test]
    async fn driver_failure_during_enablement_wait_keeps_its_kind() {
        let mut driver = BrokenTransport;
        let mut table =
            SearchableTable::new(&mut driver, TableLocators::orders(), PageTimeouts::fast());
        let err = table.await_action_ready().await.unwrap_err();
        assert!(matches!(err, HarnessError::Driver(_)));
    }

    #[test]
    fn order_header_with_date_parses() {
        let order = parse_order_header("Заказ № 1500 от 30.08.2026").unwrap();
        assert_eq!(order.number, "1500");
        assert_eq!(
            order.date,
            NaiveDate::from_ymd_opt(2026, 8, 30)
        );
    }

    #[test]
    fn order_header_without_date_parses() {
        let order = parse_order_header("Заказ №2077").unwrap();
        assert_eq!(order.number, "2077");
        assert!(order.date.is_none());
    }

    #[test]
    fn header_without_number_is_structural() {
        let err = parse_order_header("Новый заказ").unwrap_err();
        assert!(matches!(err, HarnessError::StructuralAbsence(_)));
    }

    #[test]
    fn spec_row_converts_and_total_row_is_skipped() {
        let row = RowSnapshot {
            index: 0,
            cells: vec!["Корпус".into(), "0Т4.21".into(), "2".into()],
            colspan: None,
        };
        let item = spec_item_from_row(&row).unwrap();
        assert_eq!(item.designation, "0Т4.21");
        assert_eq!(item.quantity, 2);

        let total = RowSnapshot {
            index: 1,
            cells: vec!["Итого".into(), "".into(), "2".into()],
            colspan: None,
        };
        assert!(erp_row_filter().is_excluded(&total));
    }
}
