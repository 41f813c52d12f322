//! The store: single writer of one feature's state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use tokio::sync::watch;
use uuid::Uuid;

use crate::cancel::{CancelId, CancelToken, CancellationRegistry};
use crate::error::{KeelError, Result};
use crate::reducer::Reducer;
use crate::schedule::{EffectPlan, EffectSink, SendTask};

/// Owns one feature's state, applies actions one at a time and runs the
/// effects the reducer returns.
///
/// Cloning a `Store` yields another handle to the same state. When the last
/// handle is dropped every in-flight effect is cancelled; running effects
/// only hold a weak reference and never keep the store alive.
pub struct Store<R: Reducer> {
    inner: Arc<Inner<R>>,
}

impl<R: Reducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<R: Reducer> {
    id: Uuid,
    reducer: R,
    core: Mutex<Core<R::State>>,
    snapshots: watch::Sender<R::State>,
    /// Runtime effects are spawned on, captured at construction.
    runtime: Option<Handle>,
    span: tracing::Span,
}

/// Everything the store mutates, behind one lock.
struct Core<S> {
    state: S,
    registry: CancellationRegistry,
    closed: bool,
}

impl<R> Store<R>
where
    R: Reducer,
    R::State: Clone + Send + Sync,
{
    /// Creates a store bound to the tokio runtime it is created in, if any.
    ///
    /// Effects always run on that runtime, so `send` may later be called
    /// from any thread, including ones outside the runtime.
    pub fn new(initial: R::State, reducer: R) -> Self {
        Self::build(initial, reducer, Handle::try_current().ok())
    }

    /// Creates a store whose effects run on `runtime`.
    pub fn with_handle(initial: R::State, reducer: R, runtime: Handle) -> Self {
        Self::build(initial, reducer, Some(runtime))
    }

    fn build(initial: R::State, reducer: R, runtime: Option<Handle>) -> Self {
        let id = Uuid::new_v4();
        let span = tracing::debug_span!("store", store_id = %id);
        let (snapshots, _) = watch::channel(initial.clone());
        tracing::debug!(parent: &span, "store created");

        Self {
            inner: Arc::new(Inner {
                id,
                reducer,
                core: Mutex::new(Core {
                    state: initial,
                    registry: CancellationRegistry::new(),
                    closed: false,
                }),
                snapshots,
                runtime,
                span,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Applies `action` and schedules its effect.
    ///
    /// Failures are logged; use [`try_send`](Self::try_send) to observe them.
    pub fn send(&self, action: R::Action) -> SendTask {
        match self.try_send(action) {
            Ok(task) => task,
            Err(err) => {
                tracing::warn!(parent: &self.inner.span, error = %err, "action not applied");
                SendTask::default()
            }
        }
    }

    /// Applies `action` and schedules its effect.
    ///
    /// The reducer runs under the store lock, so no two sends interleave.
    /// Effects start after the lock is released. The returned [`SendTask`]
    /// tracks the fire-and-forget work this action started.
    pub fn try_send(&self, action: R::Action) -> Result<SendTask> {
        self.inner.apply(action, None)
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> R::State {
        self.inner.lock().state.clone()
    }

    /// Runs `f` on a snapshot of the current state.
    ///
    /// The lock is released before `f` runs, so `f` may call back into the
    /// store.
    pub fn with_state<T>(&self, f: impl FnOnce(&R::State) -> T) -> T {
        let snapshot = self.state();
        f(&snapshot)
    }

    /// Receiver that sees the state after every completed send.
    pub fn subscribe(&self) -> watch::Receiver<R::State> {
        self.inner.snapshots.subscribe()
    }

    /// Cancels the effect registered under `id`. No-op when none is.
    pub fn cancel(&self, id: &CancelId) -> bool {
        self.inner.lock().registry.cancel(id)
    }

    pub fn is_active(&self, id: &CancelId) -> bool {
        self.inner.lock().registry.contains(id)
    }

    /// Ids of the cancellable effects currently in flight.
    pub fn active_effects(&self) -> Vec<CancelId> {
        self.inner.lock().registry.ids()
    }

    /// Cancels every in-flight effect and rejects further actions.
    pub fn shutdown(&self) {
        let mut core = self.inner.lock();
        if core.closed {
            return;
        }
        core.closed = true;
        let cancelled = core.registry.cancel_all();
        tracing::debug!(parent: &self.inner.span, cancelled, "store shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl<R: Reducer> Inner<R> {
    fn lock(&self) -> MutexGuard<'_, Core<R::State>> {
        // A reducer that panicked left the state as it was mid-transition;
        // keep serving it rather than poisoning every later send.
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R> Inner<R>
where
    R: Reducer,
    R::State: Clone + Send + Sync,
{
    /// Runs the reducer and launches the resulting effect.
    ///
    /// `guard` is the token of the effect that emitted `action`; if it was
    /// cancelled the action is dropped. The check happens under the lock, so
    /// nothing from a cancelled effect is applied after the cancellation.
    ///
    /// Without a runtime the reducer runs on a copy of the state, which is
    /// committed only if the effect needs no task. An action is either fully
    /// applied with its effect scheduled, or rejected with the state untouched.
    fn apply(self: &Arc<Self>, action: R::Action, guard: Option<&CancelToken>) -> Result<SendTask> {
        let _entered = self.span.enter();
        let runtime = self.runtime.clone().or_else(|| Handle::try_current().ok());

        let (plan, handle) = {
            let mut core = self.lock();
            if core.closed {
                return Err(KeelError::StoreClosed(self.id));
            }
            if guard.is_some_and(CancelToken::is_cancelled) {
                tracing::trace!("dropping action from cancelled effect");
                return Ok(SendTask::default());
            }

            let core = &mut *core;
            let effect = match runtime {
                Some(_) => self.reducer.reduce(&mut core.state, action),
                None => {
                    let mut next = core.state.clone();
                    let effect = self.reducer.reduce(&mut next, action);
                    if effect.spawns_tasks() {
                        return Err(KeelError::NoRuntime);
                    }
                    core.state = next;
                    effect
                }
            };
            let plan = EffectPlan::prepare(effect, &mut core.registry);
            self.snapshots.send_replace(core.state.clone());

            match runtime {
                Some(handle) if !plan.is_empty() => (plan, handle),
                _ => return Ok(SendTask::default()),
            }
        };

        let sink = StoreSink {
            inner: Arc::downgrade(self),
        };
        Ok(plan.spawn(&handle, sink))
    }
}

impl<R: Reducer> Drop for Inner<R> {
    fn drop(&mut self) {
        let core = self.core.get_mut().unwrap_or_else(PoisonError::into_inner);
        let cancelled = core.registry.cancel_all();
        if cancelled > 0 {
            tracing::debug!(parent: &self.span, cancelled, "store dropped, effects cancelled");
        }
    }
}

/// Route from running effects back into the store.
struct StoreSink<R: Reducer> {
    inner: Weak<Inner<R>>,
}

impl<R: Reducer> Clone for StoreSink<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<R> EffectSink<R::Action> for StoreSink<R>
where
    R: Reducer,
    R::State: Clone + Send + Sync,
{
    fn emit(&self, action: R::Action, guard: Option<&CancelToken>) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        match inner.apply(action, guard) {
            Ok(_) => true,
            Err(KeelError::StoreClosed(_)) => false,
            Err(err) => {
                tracing::warn!(error = %err, "effect action not applied");
                true
            }
        }
    }

    fn release(&self, id: &CancelId, generation: u64) {
        if let Some(inner) = self.inner.upgrade() {
            inner.lock().registry.release(id, generation);
        }
    }
}
