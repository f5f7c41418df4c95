//! In-memory ERP simulation
//!
//! A small model of the ProdFlow surfaces (orders, production, warehouse)
//! behind the same selectors the page objects use, so the full chain --
//! page objects, searchable tables, row-action loops, scenarios -- runs
//! offline. Fault injection covers the loop's recovery paths: actions
//! that apply without acknowledging, actions that fail outright, and a
//! row no action can remove.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::debug;

use prodflow_harness::{HarnessError, HarnessResult, RowSnapshot};

use crate::driver::{PageDriver, WaitState};
use crate::pages::testid;

/// Fault injection switches
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Actions apply but never acknowledge (loop must recover by
    /// re-verification)
    pub ambiguous_actions: bool,

    /// Actions acknowledge an error and do not apply
    pub failing_actions: bool,

    /// Archive has no effect; the matching row can never be removed
    pub sticky_archive: bool,

    /// Action control reports disabled for this many attribute reads
    /// after row selection (enablement lag)
    pub enablement_lag_reads: u32,

    /// A completed kitting stays invisible for this many warehouse
    /// renders (exercises the primary tab's backoff polling)
    pub kitting_hidden_renders: u32,
}

#[derive(Debug, Clone)]
struct SimOrder {
    number: String,
    name: String,
    urgency: String,
    archived: bool,
}

#[derive(Debug, Clone)]
struct ProdRow {
    name: String,
    designation: String,
    quantity: i64,
    /// Quantity added per launch; equals the specification quantity
    batch: i64,
}

#[derive(Debug, Clone)]
struct WhRow {
    designation: String,
    status: String,
    quantity: i64,
}

/// Shared backend state, one per simulated deployment
struct SimModel {
    orders: Vec<SimOrder>,
    production: Vec<ProdRow>,
    warehouse: Vec<WhRow>,
    next_number: u32,
    faults: Faults,
    kitting_hidden_renders: u32,
    interactions: u64,
    screenshots: Vec<String>,
}

impl SimModel {
    fn assign_number(&mut self) -> String {
        let n = self.next_number;
        self.next_number += 1;
        n.to_string()
    }
}

/// Which page a session is on
#[derive(Debug, Clone, PartialEq, Eq)]
enum Page {
    Nowhere,
    Orders,
    OrderNew,
    OrderDetail(String),
    Production,
    Warehouse,
}

/// Per-tab view state
struct Session {
    page: Page,
    inputs: HashMap<String, String>,
    filters: HashMap<&'static str, String>,
    selected: HashMap<&'static str, usize>,
    ack: HashMap<&'static str, String>,
    lag_reads: u32,
    confirm_open: bool,
    busy_renders: u32,
}

impl Session {
    fn new() -> Self {
        Self {
            page: Page::Nowhere,
            inputs: HashMap::new(),
            filters: HashMap::new(),
            selected: HashMap::new(),
            ack: HashMap::new(),
            lag_reads: 0,
            confirm_open: false,
            busy_renders: 0,
        }
    }
}

/// Handle to one simulated deployment
#[derive(Clone)]
pub struct SimErp {
    model: Arc<Mutex<SimModel>>,
}

impl SimErp {
    pub fn new() -> Self {
        Self::with_faults(Faults::default())
    }

    pub fn with_faults(faults: Faults) -> Self {
        Self {
            model: Arc::new(Mutex::new(SimModel {
                orders: Vec::new(),
                production: Vec::new(),
                warehouse: Vec::new(),
                next_number: 1500,
                faults,
                kitting_hidden_renders: 0,
                interactions: 0,
                screenshots: Vec::new(),
            })),
        }
    }

    /// Fresh browser tab against this deployment.
    pub fn driver(&self) -> SimDriver {
        SimDriver {
            model: self.model.clone(),
            session: Session::new(),
        }
    }

    /// Seed an order directly, bypassing the UI (suite fixtures).
    pub async fn seed_order(&self, name: &str, urgency: &str) {
        let mut model = self.model.lock().await;
        let number = model.assign_number();
        model.orders.push(SimOrder {
            number,
            name: name.to_string(),
            urgency: urgency.to_string(),
            archived: false,
        });
    }

    /// Total driver interactions so far, for no-side-effect assertions.
    pub async fn interactions(&self) -> u64 {
        self.model.lock().await.interactions
    }

    pub async fn active_order_count(&self) -> usize {
        self.model.lock().await.orders.iter().filter(|o| !o.archived).count()
    }

    pub async fn production_quantity(&self, designation: &str) -> Option<i64> {
        self.model
            .lock()
            .await
            .production
            .iter()
            .find(|r| r.designation == designation)
            .map(|r| r.quantity)
    }

    pub async fn screenshot_names(&self) -> Vec<String> {
        self.model.lock().await.screenshots.clone()
    }
}

impl Default for SimErp {
    fn default() -> Self {
        Self::new()
    }
}

/// One simulated browser tab
pub struct SimDriver {
    model: Arc<Mutex<SimModel>>,
    session: Session,
}

/// Fixed bill of materials the simulated ERP attaches to a saved order.
/// Two sub-assemblies and three leaf parts, quantities per one product.
fn bom_cbed(product: &str) -> Vec<(String, String, i64)> {
    vec![
        (format!("{product} Корпус"), "0Т4.21".to_string(), 2),
        (format!("{product} Крышка"), "0Т4.24".to_string(), 1),
    ]
}

fn bom_detail() -> Vec<(String, String, i64)> {
    vec![
        ("Ось".to_string(), "0Т4.22".to_string(), 4),
        ("Винт".to_string(), "0Т4.23".to_string(), 8),
        ("Шайба".to_string(), "0Т4.25".to_string(), 6),
    ]
}

/// Initial kitting status of a warehouse position
const AWAITING_STATUS: &str = "Ожидает комплектации";

impl SimDriver {
    fn table_of(selector: &str) -> Option<&'static str> {
        match selector {
            testid::ORDERS_ROW | testid::ORDERS_SEARCH | testid::ORDERS_EMPTY => {
                Some(testid::ORDERS_ROW)
            }
            testid::PRODUCTION_ROW | testid::PRODUCTION_SEARCH | testid::PRODUCTION_EMPTY => {
                Some(testid::PRODUCTION_ROW)
            }
            testid::WAREHOUSE_ROW | testid::WAREHOUSE_SEARCH | testid::WAREHOUSE_EMPTY => {
                Some(testid::WAREHOUSE_ROW)
            }
            _ => None,
        }
    }

    fn button_table(selector: &str) -> Option<&'static str> {
        match selector {
            testid::ORDERS_ARCHIVE_BTN => Some(testid::ORDERS_ROW),
            testid::PRODUCTION_LAUNCH_BTN => Some(testid::PRODUCTION_ROW),
            testid::WAREHOUSE_KIT_BTN => Some(testid::WAREHOUSE_ROW),
            _ => None,
        }
    }

    /// Data rows of a table under the session's current filter.
    fn data_rows(&self, model: &mut SimModel, table: &'static str) -> Vec<Vec<String>> {
        let filter = self.session.filters.get(table).cloned().unwrap_or_default();
        let hit = |cells: &[String]| filter.is_empty() || cells.iter().any(|c| c.contains(&filter));

        match table {
            t if t == testid::ORDERS_ROW => model
                .orders
                .iter()
                .filter(|o| !o.archived)
                .map(|o| vec![o.number.clone(), o.name.clone(), o.urgency.clone()])
                .filter(|cells| hit(cells))
                .collect(),
            t if t == testid::PRODUCTION_ROW => model
                .production
                .iter()
                .map(|r| {
                    vec![r.name.clone(), r.designation.clone(), r.quantity.to_string()]
                })
                .filter(|cells| hit(cells))
                .collect(),
            t if t == testid::WAREHOUSE_ROW => {
                let hide_kitted = if model.kitting_hidden_renders > 0 {
                    model.kitting_hidden_renders -= 1;
                    true
                } else {
                    false
                };
                model
                    .warehouse
                    .iter()
                    .map(|r| {
                        let status = if hide_kitted && r.status != AWAITING_STATUS {
                            AWAITING_STATUS.to_string()
                        } else {
                            r.status.clone()
                        };
                        vec![r.designation.clone(), status, r.quantity.to_string()]
                    })
                    .filter(|cells| hit(cells))
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    /// Rendered rows: data rows plus the total row the grid appends.
    fn rendered_rows(&self, model: &mut SimModel, table: &'static str) -> Vec<RowSnapshot> {
        let data = self.data_rows(model, table);
        let mut rows: Vec<RowSnapshot> = data
            .iter()
            .enumerate()
            .map(|(index, cells)| RowSnapshot {
                index,
                cells: cells.clone(),
                colspan: None,
            })
            .collect();
        if !rows.is_empty() {
            rows.push(RowSnapshot {
                index: rows.len(),
                cells: vec![
                    "Итого".to_string(),
                    String::new(),
                    data.len().to_string(),
                ],
                colspan: None,
            });
        }
        rows
    }

    fn page_for(&self, selector: &str) -> Option<Page> {
        match selector {
            testid::ORDERS_READY => Some(Page::Orders),
            testid::ORDER_FORM_READY => Some(Page::OrderNew),
            testid::PRODUCTION_READY => Some(Page::Production),
            testid::WAREHOUSE_READY => Some(Page::Warehouse),
            _ => None,
        }
    }

    /// Apply the mutating action of `button` to the selected row.
    async fn perform_action(&mut self, button: &'static str) -> HarnessResult<()> {
        let table = Self::button_table(button)
            .ok_or_else(|| HarnessError::Driver(format!("unknown action control '{button}'")))?;
        let selected = *self.session.selected.get(table).ok_or_else(|| {
            HarnessError::Driver(format!("'{button}' clicked with no row selected"))
        })?;

        let mut model = self.model.lock().await;
        let faults = model.faults.clone();
        let rows = self.rendered_rows(&mut model, table);
        let cells = rows
            .get(selected)
            .map(|r| r.cells.clone())
            .ok_or_else(|| HarnessError::Driver("selected row disappeared".to_string()))?;

        if faults.failing_actions {
            self.session
                .ack
                .insert(button, "error: запись заблокирована".to_string());
            self.session.busy_renders = 1;
            return Ok(());
        }

        match table {
            t if t == testid::ORDERS_ROW => {
                if !faults.sticky_archive {
                    let number = &cells[0];
                    if let Some(order) =
                        model.orders.iter_mut().find(|o| &o.number == number)
                    {
                        order.archived = true;
                    }
                }
                self.session.confirm_open = true;
            }
            t if t == testid::PRODUCTION_ROW => {
                let designation = &cells[1];
                if let Some(row) = model
                    .production
                    .iter_mut()
                    .find(|r| &r.designation == designation)
                {
                    row.quantity += row.batch;
                }
            }
            t if t == testid::WAREHOUSE_ROW => {
                let designation = &cells[0];
                if let Some(row) = model
                    .warehouse
                    .iter_mut()
                    .find(|r| &r.designation == designation)
                {
                    row.status = crate::pages::KITTED_STATUS.to_string();
                }
                model.kitting_hidden_renders = faults.kitting_hidden_renders;
            }
            _ => {}
        }

        if !faults.ambiguous_actions {
            self.session.ack.insert(button, "ok".to_string());
        }
        self.session.busy_renders = 1;
        Ok(())
    }

    /// Save the order form: assign a number, record the order, attach the
    /// bill of materials, seed production and warehouse positions.
    async fn save_order(&mut self) -> HarnessResult<()> {
        let name = self
            .session
            .inputs
            .get(testid::ORDER_NAME_INPUT)
            .cloned()
            .unwrap_or_default();
        let urgency = self
            .session
            .inputs
            .get(testid::ORDER_URGENCY_INPUT)
            .cloned()
            .unwrap_or_default();

        let mut model = self.model.lock().await;
        let number = model.assign_number();

        model.orders.push(SimOrder {
            number: number.clone(),
            name: name.clone(),
            urgency,
            archived: false,
        });

        for (item_name, designation, qty) in
            bom_cbed(&name).into_iter().chain(bom_detail())
        {
            if !model.production.iter().any(|r| r.designation == designation) {
                model.production.push(ProdRow {
                    name: item_name,
                    designation: designation.clone(),
                    quantity: qty,
                    batch: qty,
                });
            }
        }
        for (_, designation, qty) in bom_cbed(&name) {
            if !model.warehouse.iter().any(|r| r.designation == designation) {
                model.warehouse.push(WhRow {
                    designation,
                    status: AWAITING_STATUS.to_string(),
                    quantity: qty,
                });
            }
        }

        debug!(number = %number, "sim order saved");
        self.session.page = Page::OrderDetail(number);
        Ok(())
    }

    async fn touch(&self) {
        self.model.lock().await.interactions += 1;
    }
}

#[async_trait]
impl PageDriver for SimDriver {
    async fn goto(&mut self, path: &str) -> HarnessResult<()> {
        self.touch().await;
        self.session.page = match path {
            crate::pages::paths::ORDERS => Page::Orders,
            crate::pages::paths::ORDER_NEW => Page::OrderNew,
            crate::pages::paths::PRODUCTION => Page::Production,
            crate::pages::paths::WAREHOUSE => Page::Warehouse,
            other => {
                return Err(HarnessError::Driver(format!("sim has no route '{other}'")));
            }
        };
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> HarnessResult<()> {
        self.touch().await;
        self.session
            .inputs
            .insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn press(&mut self, selector: &str, key: &str) -> HarnessResult<()> {
        self.touch().await;
        if key == "Enter" {
            if let Some(table) = Self::table_of(selector) {
                let value = self
                    .session
                    .inputs
                    .get(selector)
                    .cloned()
                    .unwrap_or_default();
                self.session.filters.insert(table, value);
                self.session.selected.remove(table);
            }
        }
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> HarnessResult<()> {
        self.touch().await;
        match selector {
            testid::ORDER_SAVE_BTN => self.save_order().await,
            testid::CONFIRM_BTN => {
                self.session.confirm_open = false;
                Ok(())
            }
            s if s == testid::ORDERS_ARCHIVE_BTN => {
                self.perform_action(testid::ORDERS_ARCHIVE_BTN).await
            }
            s if s == testid::PRODUCTION_LAUNCH_BTN => {
                self.perform_action(testid::PRODUCTION_LAUNCH_BTN).await
            }
            s if s == testid::WAREHOUSE_KIT_BTN => {
                self.perform_action(testid::WAREHOUSE_KIT_BTN).await
            }
            other => Err(HarnessError::Driver(format!(
                "sim cannot click '{other}'"
            ))),
        }
    }

    async fn click_nth(&mut self, selector: &str, index: usize) -> HarnessResult<()> {
        self.touch().await;
        let table = Self::table_of(selector).ok_or_else(|| {
            HarnessError::Driver(format!("sim has no table rows at '{selector}'"))
        })?;
        self.session.selected.insert(table, index);
        self.session.ack.clear();
        self.session.lag_reads = self.model.lock().await.faults.enablement_lag_reads;
        Ok(())
    }

    async fn texts(&mut self, selector: &str) -> HarnessResult<Vec<String>> {
        self.touch().await;
        if selector == testid::ORDER_NUMBER_HEADER {
            if let Page::OrderDetail(number) = &self.session.page {
                let today = chrono::Local::now().date_naive();
                return Ok(vec![format!(
                    "Заказ № {} от {}",
                    number,
                    today.format("%d.%m.%Y")
                )]);
            }
            return Ok(Vec::new());
        }
        Ok(Vec::new())
    }

    async fn attr(&mut self, selector: &str, name: &str) -> HarnessResult<Option<String>> {
        self.touch().await;
        if let Some(table) = Self::button_table(selector) {
            match name {
                "class" => {
                    let selected = self.session.selected.contains_key(table);
                    if selected && self.session.lag_reads > 0 {
                        self.session.lag_reads -= 1;
                        return Ok(Some("btn disabled".to_string()));
                    }
                    return Ok(Some(if selected {
                        "btn".to_string()
                    } else {
                        "btn disabled".to_string()
                    }));
                }
                "data-ack" => {
                    let key = match selector {
                        x if x == testid::ORDERS_ARCHIVE_BTN => testid::ORDERS_ARCHIVE_BTN,
                        x if x == testid::PRODUCTION_LAUNCH_BTN => testid::PRODUCTION_LAUNCH_BTN,
                        _ => testid::WAREHOUSE_KIT_BTN,
                    };
                    return Ok(self.session.ack.get(key).cloned());
                }
                _ => return Ok(None),
            }
        }
        Ok(None)
    }

    async fn count(&mut self, selector: &str) -> HarnessResult<usize> {
        self.touch().await;
        let Some(table) = Self::table_of(selector) else {
            return Ok(0);
        };
        let mut model = self.model.lock().await;
        Ok(self.rendered_rows(&mut model, table).len())
    }

    async fn table_rows(&mut self, row_selector: &str) -> HarnessResult<Vec<RowSnapshot>> {
        self.touch().await;
        match row_selector {
            testid::SPEC_CBED_ROW | testid::SPEC_DETAIL_ROW => {
                let Page::OrderDetail(_) = &self.session.page else {
                    return Err(HarnessError::StructuralAbsence(
                        "specification tables are only rendered on a saved order".to_string(),
                    ));
                };
                let product = {
                    let model = self.model.lock().await;
                    model.orders.last().map(|o| o.name.clone()).unwrap_or_default()
                };
                let items = if row_selector == testid::SPEC_CBED_ROW {
                    bom_cbed(&product)
                } else {
                    bom_detail()
                };
                let mut rows: Vec<RowSnapshot> = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, (name, designation, qty))| RowSnapshot {
                        index,
                        cells: vec![name, designation, qty.to_string()],
                        colspan: None,
                    })
                    .collect();
                let count = rows.len();
                rows.push(RowSnapshot {
                    index: count,
                    cells: vec!["Итого".to_string(), String::new(), count.to_string()],
                    colspan: None,
                });
                Ok(rows)
            }
            _ => {
                let Some(table) = Self::table_of(row_selector) else {
                    return Ok(Vec::new());
                };
                let mut model = self.model.lock().await;
                Ok(self.rendered_rows(&mut model, table))
            }
        }
    }

    async fn wait_for(
        &mut self,
        selector: &str,
        state: WaitState,
        _timeout: Duration,
    ) -> HarnessResult<bool> {
        self.touch().await;

        if selector == testid::BUSY {
            if self.session.busy_renders > 0 {
                self.session.busy_renders -= 1;
            }
            let busy = self.session.busy_renders > 0;
            return Ok(match state {
                WaitState::Hidden | WaitState::Detached => !busy,
                WaitState::Visible | WaitState::Attached => busy,
            });
        }

        if selector == testid::CONFIRM_BTN {
            return Ok(match state {
                WaitState::Visible | WaitState::Attached => self.session.confirm_open,
                WaitState::Hidden | WaitState::Detached => !self.session.confirm_open,
            });
        }

        if selector == testid::ORDER_NUMBER_HEADER {
            let on_detail = matches!(self.session.page, Page::OrderDetail(_));
            return Ok(match state {
                WaitState::Visible | WaitState::Attached => on_detail,
                WaitState::Hidden | WaitState::Detached => !on_detail,
            });
        }

        if let Some(page) = self.page_for(selector) {
            let here = self.session.page == page;
            return Ok(match state {
                WaitState::Visible | WaitState::Attached => here,
                WaitState::Hidden | WaitState::Detached => !here,
            });
        }

        if let Some(table) = Self::table_of(selector) {
            // Empty markers: visible exactly when the filtered view has
            // no data rows.
            let mut model = self.model.lock().await;
            let empty = self.data_rows(&mut model, table).is_empty();
            return Ok(match state {
                WaitState::Visible | WaitState::Attached => empty,
                WaitState::Hidden | WaitState::Detached => !empty,
            });
        }

        // Unknown selectors never materialize.
        Ok(matches!(state, WaitState::Hidden | WaitState::Detached))
    }

    async fn screenshot(&mut self, name: &str) -> HarnessResult<Option<PathBuf>> {
        self.model.lock().await.screenshots.push(name.to_string());
        Ok(None)
    }

    async fn open_secondary(&mut self) -> HarnessResult<Box<dyn PageDriver>> {
        Ok(Box::new(SimDriver {
            model: self.model.clone(),
            session: Session::new(),
        }))
    }
}
