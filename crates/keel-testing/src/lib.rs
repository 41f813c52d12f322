//! Testing utilities for keel stores.
//!
//! [`TestStore`] runs a reducer the way a [`Store`](keel_core::Store) does,
//! but actions emitted by effects are queued instead of applied. Tests
//! assert every state change and every received action explicitly:
//!
//! ```ignore
//! let mut store = TestStore::new(CounterState::default(), feature);
//!
//! store.send(CounterAction::Increment, |s| s.count = 1);
//! store.send(CounterAction::RequestFact, |s| s.is_loading = true);
//! store
//!     .receive(CounterAction::FactReceived("1 is a fact".into()), |s| {
//!         s.is_loading = false;
//!         s.fact = Some("1 is a fact".into());
//!     })
//!     .await;
//! store.finish().await;
//! ```

use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use keel_core::{
    CancelId, CancelToken, CancellationRegistry, Effect, EffectPlan, EffectSink, Reducer, SendTask,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// How long [`TestStore::receive`] and [`TestStore::finish`] wait by default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

struct Shared<A> {
    registry: Mutex<CancellationRegistry>,
    received: mpsc::UnboundedSender<A>,
}

impl<A> Shared<A> {
    fn registry(&self) -> MutexGuard<'_, CancellationRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct QueueSink<A> {
    shared: Arc<Shared<A>>,
}

impl<A> Clone for QueueSink<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A: Send + 'static> EffectSink<A> for QueueSink<A> {
    fn emit(&self, action: A, guard: Option<&CancelToken>) -> bool {
        let _registry = self.shared.registry();
        if guard.is_some_and(CancelToken::is_cancelled) {
            return true;
        }
        self.shared.received.send(action).is_ok()
    }

    fn release(&self, id: &CancelId, generation: u64) {
        self.shared.registry().release(id, generation);
    }
}

/// Exhaustive test harness for a reducer and its effects.
///
/// Every `send` and `receive` states the exact expected state. `finish`
/// fails when effect-emitted actions were never received or effects are
/// still running. Methods panic on mismatch, like `assert_eq!`.
pub struct TestStore<R: Reducer> {
    reducer: R,
    state: R::State,
    shared: Arc<Shared<R::Action>>,
    received: mpsc::UnboundedReceiver<R::Action>,
    in_flight: Vec<SendTask>,
    timeout: Duration,
}

impl<R> TestStore<R>
where
    R: Reducer,
    R::State: Clone + PartialEq + Debug,
    R::Action: PartialEq + Debug,
{
    pub fn new(initial: R::State, reducer: R) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            reducer,
            state: initial,
            shared: Arc::new(Shared {
                registry: Mutex::new(CancellationRegistry::new()),
                received: tx,
            }),
            received: rx,
            in_flight: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Changes how long `receive` and `finish` wait for effects.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> &R::State {
        &self.state
    }

    /// Ids of the cancellable effects currently in flight.
    pub fn active_effects(&self) -> Vec<CancelId> {
        self.shared.registry().ids()
    }

    /// Sends `action` and asserts the state equals the current state after
    /// `expect` has been applied to it.
    #[track_caller]
    pub fn send(&mut self, action: R::Action, expect: impl FnOnce(&mut R::State)) {
        let description = format!("{action:?}");
        self.apply(action, &description, expect);
    }

    /// Waits for the next action emitted by an effect, asserts it equals
    /// `expected`, applies it and asserts the resulting state.
    pub async fn receive(&mut self, expected: R::Action, expect: impl FnOnce(&mut R::State)) {
        let action = match tokio::time::timeout(self.timeout, self.received.recv()).await {
            Ok(Some(action)) => action,
            Ok(None) => panic!("effect channel closed while waiting for {expected:?}"),
            Err(_) => panic!(
                "expected to receive {expected:?}, but no action arrived within {:?}",
                self.timeout
            ),
        };
        assert_eq!(action, expected, "received an unexpected action");

        let description = format!("received {action:?}");
        self.apply(action, &description, expect);
    }

    /// Discards every action emitted so far without asserting on it.
    pub fn skip_received_actions(&mut self) -> usize {
        let mut skipped = 0;
        while self.received.try_recv().is_ok() {
            skipped += 1;
        }
        skipped
    }

    /// Cancels every cancellable effect still in flight.
    pub fn skip_in_flight_effects(&mut self) -> usize {
        self.shared.registry().cancel_all()
    }

    /// Asserts that nothing is left: no unreceived actions, no running effects.
    pub async fn finish(mut self) {
        for task in std::mem::take(&mut self.in_flight) {
            if tokio::time::timeout(self.timeout, task.wait()).await.is_err() {
                panic!("an effect was still running after {:?}", self.timeout);
            }
        }

        if let Ok(action) = self.received.try_recv() {
            panic!("action {action:?} was emitted by an effect but never received");
        }

        let active = self.active_effects();
        assert!(
            active.is_empty(),
            "effects still running at finish: {active:?}; cancel them or call skip_in_flight_effects"
        );
    }

    #[track_caller]
    fn apply(&mut self, action: R::Action, description: &str, expect: impl FnOnce(&mut R::State)) {
        let mut expected = self.state.clone();
        expect(&mut expected);

        let effect = self.reducer.reduce(&mut self.state, action);
        self.schedule(effect);

        assert_eq!(
            self.state, expected,
            "state after {description} did not match the expectation"
        );
    }

    #[track_caller]
    fn schedule(&mut self, effect: Effect<R::Action>) {
        let plan = EffectPlan::prepare(effect, &mut self.shared.registry());
        if plan.is_empty() {
            return;
        }
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => panic!("TestStore effects need a tokio runtime; use #[tokio::test]"),
        };
        let sink = QueueSink {
            shared: Arc::clone(&self.shared),
        };
        let task = plan.spawn(&handle, sink);
        self.in_flight.retain(|task| !task.is_finished());
        if !task.is_empty() {
            self.in_flight.push(task);
        }
    }
}

impl<R: Reducer> Drop for TestStore<R> {
    fn drop(&mut self) {
        self.shared
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel_all();
        for task in &self.in_flight {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::reducer_fn;

    const TICK: CancelId = CancelId::new("tick");

    #[derive(Debug, Clone, PartialEq)]
    enum Action {
        Load,
        Loaded(u32),
        Start,
        Stop,
        Tick,
    }

    fn reducer() -> impl Reducer<State = u32, Action = Action> {
        reducer_fn(|value: &mut u32, action: Action| match action {
            Action::Load => Effect::run(async { Ok(Some(Action::Loaded(9))) }),
            Action::Loaded(n) => {
                *value = n;
                Effect::none()
            }
            Action::Start => Effect::every(TICK, Duration::from_secs(1), Action::Tick),
            Action::Stop => Effect::cancel(TICK),
            Action::Tick => {
                *value += 1;
                Effect::none()
            }
        })
    }

    #[tokio::test]
    async fn receive_applies_effect_action() {
        let mut store = TestStore::new(0, reducer());
        store.send(Action::Load, |_| {});
        store.receive(Action::Loaded(9), |v| *v = 9).await;
        store.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_effect_must_be_stopped() {
        let mut store = TestStore::new(0, reducer());
        store.send(Action::Start, |_| {});
        store.receive(Action::Tick, |v| *v = 1).await;
        store.receive(Action::Tick, |v| *v = 2).await;
        store.send(Action::Stop, |_| {});
        store.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn skipping_in_flight_effects_allows_finish() {
        let mut store = TestStore::new(0, reducer());
        store.send(Action::Start, |_| {});
        assert_eq!(store.active_effects(), vec![TICK]);
        assert_eq!(store.skip_in_flight_effects(), 1);
        store.finish().await;
    }

    #[tokio::test]
    async fn finished_effects_are_not_kept() {
        let mut store = TestStore::new(0, reducer());
        for _ in 0..3 {
            store.send(Action::Load, |_| {});
            store.receive(Action::Loaded(9), |v| *v = 9).await;
            tokio::task::yield_now().await;
        }
        // Only the latest fetch can still be pending.
        store.send(Action::Load, |_| {});
        assert_eq!(store.in_flight.len(), 1);
        store.receive(Action::Loaded(9), |_| {}).await;
        store.finish().await;
    }

    #[tokio::test]
    #[should_panic(expected = "did not match")]
    async fn wrong_expectation_panics() {
        let mut store = TestStore::new(0, reducer());
        store.send(Action::Loaded(3), |v| *v = 4);
    }

    #[tokio::test]
    #[should_panic(expected = "never received")]
    async fn unreceived_action_fails_finish() {
        let mut store = TestStore::new(0, reducer());
        store.send(Action::Load, |_| {});
        store.finish().await;
    }
}
