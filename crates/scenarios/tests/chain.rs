//! Full-chain integration tests against the in-memory simulation
//!
//! The whole browser-facing suite runs here with no deployment: the sim
//! answers the same selectors the page objects use, so these tests cover
//! the page objects, the searchable-table binding, the row-action loops,
//! and the runner's ordering and failure semantics together.

use prodflow_scenarios::runner::{ScenarioRunner, SuiteCx};
use prodflow_scenarios::scenarios;
use prodflow_scenarios::{Faults, SimErp, SuiteConfig};

fn cx_for(erp: &SimErp) -> SuiteCx {
    SuiteCx::new(SuiteConfig::default(), Box::new(erp.driver())).unwrap()
}

fn ui_runner() -> ScenarioRunner {
    let mut runner = ScenarioRunner::new(scenarios::suite());
    runner.retain_tagged("ui");
    runner
}

#[tokio::test]
async fn full_chain_passes_against_the_sim() {
    let erp = SimErp::new();
    let mut cx = cx_for(&erp);

    let result = ui_runner().run(&mut cx).await;
    assert!(
        result.all_passed(),
        "failures: {:?}",
        result
            .results
            .iter()
            .filter(|r| !r.success)
            .map(|r| (&r.name, &r.error))
            .collect::<Vec<_>>()
    );

    // Two orders created, none archived by the stale sweep.
    assert_eq!(erp.active_order_count().await, 2);

    // 0Т4.21: seeded 2, first launch +2, second order's launch +2.
    assert_eq!(erp.production_quantity("0Т4.21").await, Some(6));
    // Leaf parts launched once each: seeded quantity doubled.
    assert_eq!(erp.production_quantity("0Т4.22").await, Some(8));
    assert_eq!(erp.production_quantity("0Т4.23").await, Some(16));
    assert_eq!(erp.production_quantity("0Т4.25").await, Some(12));
}

#[tokio::test]
async fn state_is_threaded_between_scenarios() {
    let erp = SimErp::new();
    let mut cx = cx_for(&erp);

    let result = ui_runner().run(&mut cx).await;
    assert!(result.all_passed());

    let first = cx.state.order.as_ref().expect("first order recorded");
    let second = cx.state.second_order.as_ref().expect("second order recorded");
    assert_eq!(first.number, "1500");
    assert_eq!(second.number, "1501");
    assert!(!cx.state.urgency_date_on_table.is_empty());
    // Descendants reflect the second order's specification after the
    // clear-then-repopulate in create-second-order.
    assert_eq!(cx.state.descendants_cbed.len(), 2);
    assert_eq!(cx.state.descendants_detail.len(), 3);
}

#[tokio::test]
async fn missing_precondition_fails_without_touching_the_app() {
    let erp = SimErp::new();
    let mut cx = cx_for(&erp);

    let mut runner = ScenarioRunner::new(scenarios::suite());
    runner.retain_named("launch-assemblies");

    let before = erp.interactions().await;
    let result = runner.run(&mut cx).await;
    assert_eq!(result.failed, 1);

    let error = result.results[0].error.as_deref().unwrap_or_default();
    assert!(
        error.contains("create-order"),
        "error should name the producing scenario: {error}"
    );
    // The scenario must fail before any page interaction.
    assert_eq!(erp.interactions().await, before);
    // The runner still captured a failure screenshot.
    assert!(erp
        .screenshot_names()
        .await
        .contains(&"launch-assemblies-failure".to_string()));
}

#[tokio::test]
async fn rerunning_create_order_does_not_duplicate_descendants() {
    let erp = SimErp::new();
    let mut cx = cx_for(&erp);

    let mut runner = ScenarioRunner::new(scenarios::suite());
    runner.retain_named("create-order");

    for _ in 0..2 {
        let result = runner.run(&mut cx).await;
        assert!(result.all_passed());
    }

    assert_eq!(cx.state.descendants_cbed.len(), 2);
    assert_eq!(cx.state.descendants_detail.len(), 3);
    assert_eq!(erp.active_order_count().await, 2);
}

#[tokio::test]
async fn unacknowledged_actions_are_recovered_by_reverification() {
    let erp = SimErp::with_faults(Faults {
        ambiguous_actions: true,
        ..Faults::default()
    });
    let mut cx = cx_for(&erp);

    let result = ui_runner().run(&mut cx).await;
    assert!(
        result.all_passed(),
        "failures: {:?}",
        result
            .results
            .iter()
            .filter(|r| !r.success)
            .map(|r| (&r.name, &r.error))
            .collect::<Vec<_>>()
    );
    assert_eq!(erp.production_quantity("0Т4.21").await, Some(6));
}

#[tokio::test]
async fn acknowledged_failure_stops_the_launch_scenario() {
    let erp = SimErp::with_faults(Faults {
        failing_actions: true,
        ..Faults::default()
    });
    let mut cx = cx_for(&erp);

    let result = ui_runner().run(&mut cx).await;
    assert!(!result.all_passed());

    let launch = result
        .results
        .iter()
        .find(|r| r.name == "launch-assemblies")
        .expect("launch scenario ran");
    assert!(!launch.success);
    let error = launch.error.as_deref().unwrap_or_default();
    assert!(
        error.contains("запись заблокирована"),
        "error should carry the rejection reason: {error}"
    );
}

#[tokio::test]
async fn unremovable_row_hits_the_iteration_ceiling() {
    let erp = SimErp::with_faults(Faults {
        sticky_archive: true,
        ..Faults::default()
    });
    erp.seed_order(
        &format!("{} заказ", scenarios::STALE_ORDER_TERM),
        "01.01.2026",
    )
    .await;
    let mut cx = cx_for(&erp);

    let mut runner = ScenarioRunner::new(scenarios::suite());
    runner.retain_named("archive-stale-orders");

    let result = runner.run(&mut cx).await;
    assert_eq!(result.failed, 1);
    let error = result.results[0].error.as_deref().unwrap_or_default();
    assert!(error.contains("100"), "error should carry the ceiling: {error}");
    assert!(
        error.contains(scenarios::STALE_ORDER_TERM),
        "error should carry the search term: {error}"
    );
}

#[tokio::test]
async fn laggy_action_enablement_is_waited_out() {
    let erp = SimErp::with_faults(Faults {
        enablement_lag_reads: 3,
        ..Faults::default()
    });
    let mut cx = cx_for(&erp);

    let result = ui_runner().run(&mut cx).await;
    assert!(result.all_passed());
}

#[tokio::test]
async fn kitting_from_second_tab_becomes_observable_in_the_first() {
    let erp = SimErp::with_faults(Faults {
        kitting_hidden_renders: 3,
        ..Faults::default()
    });
    let mut cx = cx_for(&erp);

    let result = ui_runner().run(&mut cx).await;
    assert!(
        result.all_passed(),
        "failures: {:?}",
        result
            .results
            .iter()
            .filter(|r| !r.success)
            .map(|r| (&r.name, &r.error))
            .collect::<Vec<_>>()
    );
}
