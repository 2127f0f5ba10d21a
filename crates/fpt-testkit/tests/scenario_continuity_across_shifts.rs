//! Scenario: each entry starts where the previous shift ended.
//!
//! # Invariants under test
//! - predecessor = greatest (date, shift) strictly before the target
//! - no history resolves to None, never a fabricated 0
//! - a stopped shift without an end reading passes its start through
//! - an operator-supplied start is ignored when history exists
//! - a new machine with a delta formula and no start is rejected, stopped or not

use fpt_output::Formula;
use fpt_reconcile::{
    resolve_prior_end, submit_entry, Confirmation, EntryError, EntryPolicy, StartSource,
};
use fpt_schemas::{MachineId, Shift};
use fpt_testkit::fixtures::{date, history, item, machine, payload, staff, SPINNING};
use fpt_testkit::MemoryStore;

fn store_with_history() -> MemoryStore {
    MemoryStore::new()
        .with_item(item(10, "CD30", Some(30.0)))
        .with_machine(machine(1, "RING-01", SPINNING, Formula::CounterDelta, Some(10), None))
        .with_log(history(1, date(2024, 1, 1), Shift::First, 10, 0.0, Some(100.0)))
        .with_log(history(1, date(2024, 1, 1), Shift::Second, 10, 100.0, Some(150.0)))
}

#[tokio::test]
async fn predecessor_end_follows_date_then_shift() {
    let store = store_with_history();
    let m = MachineId(1);

    assert_eq!(
        resolve_prior_end(&store, m, date(2024, 1, 1), Shift::Second).await.unwrap(),
        Some(100.0)
    );
    assert_eq!(
        resolve_prior_end(&store, m, date(2024, 1, 2), Shift::First).await.unwrap(),
        Some(150.0)
    );
    assert_eq!(
        resolve_prior_end(&store, m, date(2024, 1, 1), Shift::Third).await.unwrap(),
        Some(150.0)
    );
}

#[tokio::test]
async fn machine_without_history_has_no_prior() {
    let store = store_with_history();
    assert_eq!(
        resolve_prior_end(&store, MachineId(99), date(2024, 1, 1), Shift::First)
            .await
            .unwrap(),
        None
    );
    assert_eq!(
        resolve_prior_end(&store, MachineId(1), date(2024, 1, 1), Shift::First)
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn stopped_predecessor_without_end_contributes_its_start() {
    let store = store_with_history()
        .with_log(history(1, date(2024, 1, 1), Shift::Third, 10, 150.0, None));
    assert_eq!(
        resolve_prior_end(&store, MachineId(1), date(2024, 1, 2), Shift::First)
            .await
            .unwrap(),
        Some(150.0)
    );
}

#[tokio::test]
async fn submission_continues_from_predecessor() {
    let store = store_with_history();
    let policy = EntryPolicy::default();
    let actor = staff(5, SPINNING);

    let mut p = payload(1, "2024-01-02", 1, 180.0);
    p.start_index = Some(120.0); // stale value typed by the operator

    let out = submit_entry(&store, &policy, &actor, &p, Confirmation::default())
        .await
        .unwrap();
    assert_eq!(out.start.value, 150.0);
    assert_eq!(out.start.source, StartSource::Continuity);
    assert_eq!(out.output, 30.0);
    assert_eq!(out.log.start_index, 150.0);

    // The next shift builds on the one just written.
    let out = submit_entry(
        &store,
        &policy,
        &actor,
        &payload(1, "2024-01-02", 2, 230.0),
        Confirmation::default(),
    )
    .await
    .unwrap();
    assert_eq!(out.start.value, 180.0);
    assert_eq!(out.output, 50.0);
}

#[tokio::test]
async fn new_delta_machine_needs_an_explicit_start() {
    let store = MemoryStore::new()
        .with_item(item(10, "CD30", Some(30.0)))
        .with_machine(machine(2, "RING-02", SPINNING, Formula::CounterDelta, Some(10), None));
    let policy = EntryPolicy::default();
    let actor = staff(5, SPINNING);

    let err = submit_entry(
        &store,
        &policy,
        &actor,
        &payload(2, "2024-01-01", 1, 5_000.0),
        Confirmation::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EntryError::MissingField("startIndex")), "got {err:?}");
    assert!(store.logs().is_empty());

    let mut p = payload(2, "2024-01-01", 1, 5_040.0);
    p.start_index = Some(5_000.0);
    let out = submit_entry(&store, &policy, &actor, &p, Confirmation::default())
        .await
        .unwrap();
    assert_eq!(out.start.source, StartSource::Supplied);
    assert_eq!(out.output, 40.0);
}

#[tokio::test]
async fn new_direct_reading_machine_defaults_start_to_zero() {
    let store = MemoryStore::new()
        .with_item(item(10, "CD30", None))
        .with_machine(machine(3, "SCALE-01", SPINNING, Formula::DirectReading, Some(10), None));

    let out = submit_entry(
        &store,
        &EntryPolicy::default(),
        &staff(5, SPINNING),
        &payload(3, "2024-01-01", 1, 42.5),
        Confirmation::default(),
    )
    .await
    .unwrap();
    assert_eq!(out.output, 42.5);
    assert_eq!(out.start.source, StartSource::Default);
}

#[tokio::test]
async fn stopped_first_entry_on_delta_machine_needs_a_real_start() {
    let store = MemoryStore::new()
        .with_item(item(10, "CD30", Some(30.0)))
        .with_machine(machine(2, "RING-02", SPINNING, Formula::CounterDelta, Some(10), None));
    let policy = EntryPolicy::default();
    let actor = staff(5, SPINNING);

    let mut stopped = payload(2, "2024-01-01", 1, 0.0);
    stopped.end_index = None;
    stopped.is_stopped = true;

    let err = submit_entry(&store, &policy, &actor, &stopped, Confirmation::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EntryError::MissingField("startIndex")), "got {err:?}");
    assert!(store.logs().is_empty());
    assert_eq!(
        resolve_prior_end(&store, MachineId(2), date(2024, 1, 1), Shift::Second)
            .await
            .unwrap(),
        None
    );

    stopped.start_index = Some(50_000.0);
    let out = submit_entry(&store, &policy, &actor, &stopped, Confirmation::default())
        .await
        .unwrap();
    assert_eq!(out.output, 0.0);
    assert_eq!(out.log.start_index, 50_000.0);
    assert_eq!(out.log.end_index, None);

    let out = submit_entry(
        &store,
        &policy,
        &actor,
        &payload(2, "2024-01-01", 2, 50_040.0),
        Confirmation::default(),
    )
    .await
    .unwrap();
    assert_eq!(out.start.value, 50_000.0);
    assert_eq!(out.start.source, StartSource::Continuity);
    assert_eq!(out.output, 40.0);
    assert!(!out.assessment.implausible);
}
