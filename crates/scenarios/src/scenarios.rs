//! The chained E2E suite
//!
//! Scenario order is load-bearing: create-order writes the order number
//! and descendant lists that every later scenario consumes through the
//! shared state's `require_*` accessors. The API scenarios at the end are
//! independent of the browser chain and carry the `api` tag so they can
//! run alone.

use chrono::{Duration, Local, NaiveDate};
use serde_json::json;
use tracing::info;

use prodflow_harness::HarnessError;

use crate::pages::{OrdersPage, ProductionPage, WarehousePage, KITTED_STATUS};
use crate::runner::{Scenario, SuiteCx};

/// Product name of the order the chain tracks
pub const PRODUCT_NAME: &str = "Редуктор";

/// Product name of the second-order variant chain
pub const SECOND_PRODUCT_NAME: &str = "Насос";

/// Search term the archive sweep uses; orders carrying it are test
/// leftovers with no downstream consumers
pub const STALE_ORDER_TERM: &str = "Списанный";

/// Urgency date entered on order creation and re-checked off the table.
fn planned_urgency() -> NaiveDate {
    Local::now().date_naive() + Duration::days(7)
}

/// The full suite in its required order.
pub fn suite() -> Vec<Scenario> {
    vec![
        create_order(),
        order_appears_in_search(),
        archive_stale_orders(),
        launch_assemblies(),
        launch_parts(),
        warehouse_receipt(),
        create_second_order(),
        launch_second_order(),
        api_auth_required(),
        api_rejects_injection(),
        api_concurrent_creation(),
    ]
}

/// Create the tracked order and parse its specification into state.
fn create_order() -> Scenario {
    Scenario::new("create-order", &["ui", "orders"], |cx| {
        Box::pin(async move {
            let timeouts = cx.config.page_timeouts();
            let mut page = OrdersPage::new(cx.driver.as_mut(), timeouts);

            let order = page.create_order(PRODUCT_NAME, planned_urgency()).await?;
            info!(number = %order.number, "order created");

            page.read_specification(&mut cx.state).await?;
            cx.soft.check(
                "specification has sub-assemblies",
                !cx.state.descendants_cbed.is_empty(),
                "cbed table parsed to zero rows",
            );
            cx.soft.check(
                "specification has parts",
                !cx.state.descendants_detail.is_empty(),
                "detail table parsed to zero rows",
            );

            cx.state.order = Some(order);
            Ok(())
        })
    })
}

/// Search the orders table for the tracked order and soft-check its
/// urgency date against what was entered.
fn order_appears_in_search() -> Scenario {
    Scenario::new("order-appears-in-search", &["ui", "orders"], |cx| {
        Box::pin(async move {
            let number = cx.state.require_order()?.number.clone();
            let timeouts = cx.config.page_timeouts();
            let mut page = OrdersPage::new(cx.driver.as_mut(), timeouts);

            let on_table = page.urgency_date_of(&number).await?;
            let expected = planned_urgency().format("%d.%m.%Y").to_string();
            cx.soft.check_eq("дата срочности", &expected, &on_table);

            cx.state.urgency_date_on_table = on_table;
            Ok(())
        })
    })
}

/// Archive every leftover order matching the stale term. Zero matches up
/// front is valid convergence, not an error.
fn archive_stale_orders() -> Scenario {
    Scenario::new("archive-stale-orders", &["ui", "orders"], |cx| {
        Box::pin(async move {
            let timeouts = cx.config.page_timeouts();
            let mut page = OrdersPage::new(cx.driver.as_mut(), timeouts);

            let report = page.archive_all(STALE_ORDER_TERM).await?;
            info!(
                archived = report.actions_performed,
                iterations = report.iterations,
                "stale orders swept"
            );
            Ok(())
        })
    })
}

/// Launch every sub-assembly of the tracked order into production; each
/// launch must grow the quantity by exactly the specification amount.
fn launch_assemblies() -> Scenario {
    Scenario::new("launch-assemblies", &["ui", "production"], |cx| {
        Box::pin(async move {
            let items = cx.state.require_cbed()?.to_vec();
            let timeouts = cx.config.page_timeouts();
            let mut page = ProductionPage::new(cx.driver.as_mut(), timeouts);

            for item in &items {
                let report = page.launch(item, i64::from(item.quantity)).await?;
                if let (Some(before), Some(after)) =
                    (report.quantity_before, report.quantity_after)
                {
                    cx.state.quantity_before = before;
                    cx.state.quantity_after = after;
                }
            }
            Ok(())
        })
    })
}

/// Same as launch-assemblies, over the leaf parts.
fn launch_parts() -> Scenario {
    Scenario::new("launch-parts", &["ui", "production"], |cx| {
        Box::pin(async move {
            let items = cx.state.require_detail()?.to_vec();
            let timeouts = cx.config.page_timeouts();
            let mut page = ProductionPage::new(cx.driver.as_mut(), timeouts);

            for item in &items {
                let report = page.launch(item, i64::from(item.quantity)).await?;
                if let (Some(before), Some(after)) =
                    (report.quantity_before, report.quantity_after)
                {
                    cx.state.quantity_before = before;
                    cx.state.quantity_after = after;
                }
            }
            Ok(())
        })
    })
}

/// Complete kitting for the first sub-assembly from a second tab and
/// verify the primary tab observes the status change.
fn warehouse_receipt() -> Scenario {
    Scenario::new("warehouse-receipt", &["ui", "warehouse"], |cx| {
        Box::pin(async move {
            let designation = cx.state.require_cbed()?[0].designation.clone();
            let timeouts = cx.config.page_timeouts();
            let mut page = WarehousePage::new(cx.driver.as_mut(), timeouts);

            page.complete_kitting_via_secondary(&designation).await?;

            let status = page.status_of(&designation).await?;
            cx.soft.check_eq("статус комплектации", KITTED_STATUS, &status);
            Ok(())
        })
    })
}

/// A second independent order through the same flow. Descendant lists are
/// cleared and repopulated, so downstream scenarios see this order's
/// specification.
fn create_second_order() -> Scenario {
    Scenario::new("create-second-order", &["ui", "orders"], |cx| {
        Box::pin(async move {
            let timeouts = cx.config.page_timeouts();
            let mut page = OrdersPage::new(cx.driver.as_mut(), timeouts);

            let order = page
                .create_order(SECOND_PRODUCT_NAME, planned_urgency())
                .await?;

            if let Some(first) = &cx.state.order {
                cx.soft.check(
                    "номера заказов различаются",
                    first.number != order.number,
                    &format!("both orders got number {}", order.number),
                );
            }

            page.read_specification(&mut cx.state).await?;
            cx.state.second_order = Some(order);
            Ok(())
        })
    })
}

/// Launch the second order's first sub-assembly; the quantity delta must
/// hold against the already-launched totals from the first chain.
fn launch_second_order() -> Scenario {
    Scenario::new("launch-second-order", &["ui", "production"], |cx| {
        Box::pin(async move {
            cx.state.require_second_order()?;
            let item = cx.state.require_cbed()?[0].clone();
            let timeouts = cx.config.page_timeouts();
            let mut page = ProductionPage::new(cx.driver.as_mut(), timeouts);

            let report = page.launch(&item, i64::from(item.quantity)).await?;
            if let (Some(before), Some(after)) = (report.quantity_before, report.quantity_after) {
                cx.state.quantity_before = before;
                cx.state.quantity_after = after;
            }
            Ok(())
        })
    })
}

/// The order list must not be served without credentials.
fn api_auth_required() -> Scenario {
    Scenario::new("api-auth-required", &["api"], |cx| {
        Box::pin(async move {
            let anonymous = cx.api.clone().without_token();
            match anonymous.get("/orders").await {
                Err(HarnessError::Api { status: 401, .. }) => Ok(()),
                Err(HarnessError::Api { status, .. }) => Err(HarnessError::ActionRejected(
                    format!("expected 401 without credentials, got {status}"),
                )),
                Ok(_) => Err(HarnessError::ActionRejected(
                    "order list was served without credentials".to_string(),
                )),
                Err(e) => Err(e),
            }
        })
    })
}

/// A hostile payload in the order name must be rejected or stored
/// verbatim; a 5xx means it reached something it should not have.
fn api_rejects_injection() -> Scenario {
    Scenario::new("api-rejects-injection", &["api"], |cx| {
        Box::pin(async move {
            let payload = json!({
                "name": "Редуктор'; DROP TABLE orders;--",
                "urgency": planned_urgency().format("%d.%m.%Y").to_string(),
            });
            match cx.api.post_json("/orders", &payload).await {
                Ok(_) => Ok(()),
                Err(HarnessError::Api { status, body }) if status < 500 => {
                    info!(status, "injection payload rejected cleanly: {body}");
                    Ok(())
                }
                Err(HarnessError::Api { status, body }) => {
                    Err(HarnessError::ActionRejected(format!(
                        "injection payload caused a server error {status}: {body}"
                    )))
                }
                Err(e) => Err(e),
            }
        })
    })
}

/// Five concurrent creations must all succeed with distinct numbers.
fn api_concurrent_creation() -> Scenario {
    Scenario::new("api-concurrent-creation", &["api"], |cx| {
        Box::pin(async move {
            let urgency = planned_urgency().format("%d.%m.%Y").to_string();
            let results = cx
                .api
                .fan_out(5, |i| {
                    (
                        "/orders".to_string(),
                        json!({
                            "name": format!("Параллельный заказ {i}"),
                            "urgency": urgency.clone(),
                        }),
                    )
                })
                .await;

            let mut numbers = Vec::new();
            for result in results {
                let body = result?;
                let number = body
                    .get("number")
                    .map(|n| n.to_string())
                    .unwrap_or_default();
                cx.soft.check(
                    "ответ содержит номер заказа",
                    !number.is_empty(),
                    &format!("body: {body}"),
                );
                numbers.push(number);
            }

            let mut unique = numbers.clone();
            unique.sort();
            unique.dedup();
            cx.soft.check(
                "номера заказов уникальны",
                unique.len() == numbers.len(),
                &format!("numbers: {numbers:?}"),
            );
            Ok(())
        })
    })
}
