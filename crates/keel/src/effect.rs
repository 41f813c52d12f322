//! Effect descriptors returned by reducers.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::cancel::CancelId;

/// Asynchronous work that finishes with at most one action.
pub type EffectFuture<A> = BoxFuture<'static, anyhow::Result<Option<A>>>;

/// Produces the action a repeating effect emits on every tick.
pub type TickFn<A> = Arc<dyn Fn() -> A + Send + Sync>;

/// Work a reducer asks the store to perform after a state transition.
///
/// Effects are descriptions: nothing runs until the store schedules them.
/// Every action an effect produces goes back through the store's `send`, so
/// effects never touch state directly.
pub enum Effect<A> {
    /// Nothing to do.
    None,
    /// Fire-and-forget work. Emits its action, if any, when it completes.
    /// With a `cancel_id` it can be cancelled and superseded like a timer.
    Run {
        work: EffectFuture<A>,
        cancel_id: Option<CancelId>,
    },
    /// Emits `tick()` once per `interval` until cancelled.
    Repeating {
        id: CancelId,
        interval: Duration,
        tick: TickFn<A>,
    },
    /// Stops whichever effect holds the id. No-op when nothing does.
    Cancel(CancelId),
    /// Several effects scheduled together, in order.
    Merge(Vec<Effect<A>>),
}

impl<A> Default for Effect<A> {
    fn default() -> Self {
        Effect::None
    }
}

impl<A> fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::None => f.write_str("None"),
            Effect::Run { cancel_id, .. } => f
                .debug_struct("Run")
                .field("cancel_id", cancel_id)
                .finish_non_exhaustive(),
            Effect::Repeating { id, interval, .. } => f
                .debug_struct("Repeating")
                .field("id", id)
                .field("interval", interval)
                .finish_non_exhaustive(),
            Effect::Cancel(id) => f.debug_tuple("Cancel").field(id).finish(),
            Effect::Merge(effects) => f.debug_tuple("Merge").field(effects).finish(),
        }
    }
}

impl<A: Send + 'static> Effect<A> {
    pub fn none() -> Self {
        Effect::None
    }

    /// Wraps a future as fire-and-forget work.
    ///
    /// The future resolves to the action to feed back, `None` to emit nothing,
    /// or an error. Errors are logged by the store and emit nothing; features
    /// that want failures in their state should map them to an action here.
    pub fn run<F>(work: F) -> Self
    where
        F: Future<Output = anyhow::Result<Option<A>>> + Send + 'static,
    {
        Effect::Run {
            work: work.boxed(),
            cancel_id: None,
        }
    }

    /// Bridges a callback-style API.
    ///
    /// `start` is called once the effect is scheduled and receives a
    /// [`Completion`]. Resuming it feeds the action back; dropping it without
    /// resuming emits nothing and logs a warning.
    pub fn from_callback<F>(start: F) -> Self
    where
        F: FnOnce(Completion<A>) + Send + 'static,
    {
        Self::run(async move {
            let (tx, rx) = oneshot::channel();
            start(Completion { tx });
            match rx.await {
                Ok(action) => Ok(Some(action)),
                Err(_) => {
                    tracing::warn!("completion dropped without being resumed");
                    Ok(None)
                }
            }
        })
    }

    /// Emits `tick()` every `interval` under `id` until cancelled.
    pub fn repeating<F>(id: CancelId, interval: Duration, tick: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Effect::Repeating {
            id,
            interval,
            tick: Arc::new(tick),
        }
    }

    /// Emits a clone of `action` every `interval` under `id` until cancelled.
    pub fn every(id: CancelId, interval: Duration, action: A) -> Self
    where
        A: Clone + Sync,
    {
        Self::repeating(id, interval, move || action.clone())
    }

    pub fn cancel(id: CancelId) -> Self {
        Effect::Cancel(id)
    }

    /// Combines effects, dropping `None`s and flattening nested merges.
    pub fn merge(effects: impl IntoIterator<Item = Effect<A>>) -> Self {
        let mut flat = Vec::new();
        for effect in effects {
            match effect {
                Effect::None => {}
                Effect::Merge(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Effect::None,
            1 => flat.pop().unwrap_or_default(),
            _ => Effect::Merge(flat),
        }
    }

    /// Makes fire-and-forget work cancellable under `id`.
    ///
    /// Starting another effect under the same id cancels this one.
    pub fn cancellable(self, id: CancelId) -> Self {
        match self {
            Effect::Run { work, .. } => Effect::Run {
                work,
                cancel_id: Some(id),
            },
            Effect::Merge(effects) => Effect::Merge(
                effects
                    .into_iter()
                    .map(|effect| effect.cancellable(id.clone()))
                    .collect(),
            ),
            other => other,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }

    /// True when running this effect needs a task, i.e. a runtime.
    /// Cancellations alone do not.
    pub fn spawns_tasks(&self) -> bool {
        match self {
            Effect::None | Effect::Cancel(_) => false,
            Effect::Run { .. } | Effect::Repeating { .. } => true,
            Effect::Merge(effects) => effects.iter().any(Effect::spawns_tasks),
        }
    }

    /// Transforms every action this effect can emit.
    pub fn map<B, F>(self, f: F) -> Effect<B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.map_shared(Arc::new(f))
    }

    fn map_shared<B>(self, f: Arc<dyn Fn(A) -> B + Send + Sync>) -> Effect<B>
    where
        B: Send + 'static,
    {
        match self {
            Effect::None => Effect::None,
            Effect::Run { work, cancel_id } => Effect::Run {
                work: work
                    .map(move |result| result.map(|action| action.map(|a| f(a))))
                    .boxed(),
                cancel_id,
            },
            Effect::Repeating { id, interval, tick } => Effect::Repeating {
                id,
                interval,
                tick: Arc::new(move || f(tick())),
            },
            Effect::Cancel(id) => Effect::Cancel(id),
            Effect::Merge(effects) => Effect::Merge(
                effects
                    .into_iter()
                    .map(|effect| effect.map_shared(Arc::clone(&f)))
                    .collect(),
            ),
        }
    }

    /// Prefixes every cancel id with `scope`.
    ///
    /// Used when a child feature is embedded more than once in a parent, so
    /// that the children do not cancel each other's effects.
    pub fn scope_cancellation(self, scope: &str) -> Self {
        match self {
            Effect::Run { work, cancel_id } => Effect::Run {
                work,
                cancel_id: cancel_id.map(|id| id.scoped(scope)),
            },
            Effect::Repeating { id, interval, tick } => Effect::Repeating {
                id: id.scoped(scope),
                interval,
                tick,
            },
            Effect::Cancel(id) => Effect::Cancel(id.scoped(scope)),
            Effect::Merge(effects) => Effect::Merge(
                effects
                    .into_iter()
                    .map(|effect| effect.scope_cancellation(scope))
                    .collect(),
            ),
            Effect::None => Effect::None,
        }
    }
}

/// One-shot handle used to finish a callback-style effect.
///
/// `resume` consumes the handle, so an effect cannot complete twice.
pub struct Completion<A> {
    tx: oneshot::Sender<A>,
}

impl<A> Completion<A> {
    pub fn resume(self, action: A) {
        if self.tx.send(action).is_err() {
            tracing::debug!("completion resumed after its effect was dropped");
        }
    }
}

impl<A> fmt::Debug for Completion<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}
