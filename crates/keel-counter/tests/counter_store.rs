mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{GatedFacts, ParityFacts};
use keel_core::{ReducerExt, Store};
use keel_counter::{CounterAction, CounterFeature, CounterState, FactClient, TIMER_ID};

fn store() -> Store<CounterFeature> {
    Store::new(
        CounterState::default(),
        CounterFeature::new(Arc::new(ParityFacts)),
    )
}

#[tokio::test]
async fn documented_scenario() {
    let store = store();
    assert_eq!(store.state(), CounterState::default());

    store.send(CounterAction::Increment);
    assert_eq!(store.state().count, 1);

    store.send(CounterAction::Decrement);
    assert_eq!(store.state().count, 0);

    let task = store.send(CounterAction::RequestFact);
    store.with_state(|s| {
        assert!(s.is_loading);
        assert_eq!(s.fact, None);
    });

    task.wait().await;
    assert_eq!(
        store.state(),
        CounterState {
            count: 0,
            fact: Some("0 is an even number".into()),
            is_loading: false,
            is_timer_running: false,
        }
    );
}

#[tokio::test]
async fn random_counting_matches_tally() {
    let store = store();
    let (mut increments, mut decrements) = (0i64, 0i64);

    for _ in 0..500 {
        if fastrand::bool() {
            store.send(CounterAction::Increment);
            increments += 1;
        } else {
            store.send(CounterAction::Decrement);
            decrements += 1;
        }
    }

    let state = store.state();
    assert_eq!(state.count, increments - decrements);
    assert_eq!(state.fact, None);
}

#[tokio::test(start_paused = true)]
async fn no_ticks_after_timer_is_toggled_off() {
    let store = store();

    store.send(CounterAction::ToggleTimer);
    assert!(store.is_active(&TIMER_ID));

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(store.state().count, 3);

    store.send(CounterAction::ToggleTimer);
    let stopped_at = store.state().count;
    assert!(!store.state().is_timer_running);
    assert!(!store.is_active(&TIMER_ID));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.state().count, stopped_at);
}

#[tokio::test(start_paused = true)]
async fn restarted_timer_replaces_the_old_one() {
    let store = store();

    store.send(CounterAction::ToggleTimer);
    tokio::time::sleep(Duration::from_millis(600)).await;
    store.send(CounterAction::ToggleTimer);
    store.send(CounterAction::ToggleTimer);
    assert_eq!(store.active_effects(), vec![TIMER_ID]);

    // The new timer ticks at 1.6s and 2.6s; the first one never fires.
    tokio::time::sleep(Duration::from_millis(2_200)).await;
    assert_eq!(store.state().count, 2);
}

#[tokio::test]
async fn subscribers_see_loading_then_fact() {
    let facts = Arc::new(GatedFacts::new());
    let store = Store::new(
        CounterState::default(),
        CounterFeature::new(Arc::clone(&facts) as Arc<dyn FactClient>).log_changes("counter"),
    );
    let mut snapshots = store.subscribe();

    let task = store.send(CounterAction::RequestFact);
    snapshots.changed().await.unwrap();
    assert!(snapshots.borrow_and_update().is_loading);

    facts.release_one();
    task.wait().await;
    snapshots.changed().await.unwrap();
    let latest = snapshots.borrow_and_update().clone();
    assert!(!latest.is_loading);
    assert_eq!(latest.fact.as_deref(), Some("0 is a fact"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_timer() {
    let store = store();
    store.send(CounterAction::ToggleTimer);
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    store.shutdown();
    assert!(store.active_effects().is_empty());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(store.state().count, 1);
}

#[test]
fn sends_from_a_plain_thread_run_effects_on_the_store_runtime() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
        .unwrap();
    let store = Store::with_handle(
        CounterState::default(),
        CounterFeature::new(Arc::new(ParityFacts)).with_timer_interval(Duration::from_secs(60)),
        runtime.handle().clone(),
    );

    let sender = store.clone();
    let task = std::thread::spawn(move || {
        sender.send(CounterAction::Increment);
        let task = sender.try_send(CounterAction::RequestFact).unwrap();
        sender.try_send(CounterAction::ToggleTimer).unwrap();
        task
    })
    .join()
    .unwrap();
    runtime.block_on(task.wait());

    let state = store.state();
    assert_eq!(state.fact.as_deref(), Some("1 is an odd number"));
    assert!(!state.is_loading);
    assert!(state.is_timer_running);
    assert!(store.is_active(&TIMER_ID));

    store.send(CounterAction::ToggleTimer);
    assert!(!store.is_active(&TIMER_ID));
    store.shutdown();
}
