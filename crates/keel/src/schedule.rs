//! Turning effect descriptors into running tasks.
//!
//! Scheduling happens in two phases. [`EffectPlan::prepare`] runs while the
//! owner holds its lock: cancellations are applied and cancel ids are claimed
//! in the registry, in the same critical section as the state transition.
//! [`EffectPlan::spawn`] runs after the lock is released and launches the
//! tasks, which report back through an [`EffectSink`].

use std::time::Duration;

use smallvec::SmallVec;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::cancel::{CancelId, CancelToken, CancellationRegistry, Registration};
use crate::effect::{Effect, EffectFuture, TickFn};

/// Where running effects deliver their actions.
pub trait EffectSink<A>: Clone + Send + Sync + 'static {
    /// Feeds an effect-emitted action back to the owner.
    ///
    /// When `guard` is given the owner must drop the action if the token was
    /// cancelled, checking under its lock. Returns `false` once the owner is
    /// gone or closed; the effect stops.
    fn emit(&self, action: A, guard: Option<&CancelToken>) -> bool;

    /// Frees `id` if `generation` still holds it.
    fn release(&self, id: &CancelId, generation: u64);
}

enum Launch<A> {
    Run {
        work: EffectFuture<A>,
        registration: Option<Registration>,
    },
    Repeating {
        registration: Registration,
        interval: Duration,
        tick: TickFn<A>,
    },
}

/// Effects resolved against the registry, ready to be spawned.
pub struct EffectPlan<A> {
    launches: Vec<Launch<A>>,
}

impl<A: Send + 'static> EffectPlan<A> {
    /// Applies cancellations and claims cancel ids for `effect`.
    pub fn prepare(effect: Effect<A>, registry: &mut CancellationRegistry) -> Self {
        let mut launches = Vec::new();
        collect(effect, registry, &mut launches);
        Self { launches }
    }

    /// True when nothing needs a task.
    pub fn is_empty(&self) -> bool {
        self.launches.is_empty()
    }

    /// Launches every task on `handle`.
    ///
    /// Fire-and-forget tasks are tracked in the returned [`SendTask`];
    /// repeating tasks run detached until cancelled.
    pub fn spawn<S>(self, handle: &Handle, sink: S) -> SendTask
    where
        S: EffectSink<A>,
    {
        let span = tracing::Span::current();
        let mut tasks = SmallVec::new();

        for launch in self.launches {
            match launch {
                Launch::Run { work, registration } => {
                    let task = run_once(work, registration, sink.clone()).instrument(span.clone());
                    tasks.push(handle.spawn(task));
                }
                Launch::Repeating {
                    registration,
                    interval,
                    tick,
                } => {
                    let task = run_repeating(registration, interval, tick, sink.clone())
                        .instrument(span.clone());
                    drop(handle.spawn(task));
                }
            }
        }

        SendTask { tasks }
    }
}

fn collect<A: Send + 'static>(
    effect: Effect<A>,
    registry: &mut CancellationRegistry,
    launches: &mut Vec<Launch<A>>,
) {
    match effect {
        Effect::None => {}
        Effect::Run { work, cancel_id } => launches.push(Launch::Run {
            work,
            registration: cancel_id.map(|id| registry.register(id)),
        }),
        Effect::Repeating { id, interval, tick } => launches.push(Launch::Repeating {
            registration: registry.register(id),
            interval,
            tick,
        }),
        Effect::Cancel(id) => {
            registry.cancel(&id);
        }
        Effect::Merge(effects) => {
            for effect in effects {
                collect(effect, registry, launches);
            }
        }
    }
}

async fn run_once<A, S>(work: EffectFuture<A>, registration: Option<Registration>, sink: S)
where
    A: Send + 'static,
    S: EffectSink<A>,
{
    let outcome = match &registration {
        Some(registration) => {
            tokio::select! {
                biased;
                _ = registration.token.cancelled() => {
                    tracing::debug!(cancel_id = %registration.id, "effect cancelled before completion");
                    return;
                }
                result = work => result,
            }
        }
        None => work.await,
    };

    match outcome {
        Ok(Some(action)) => {
            let guard = registration.as_ref().map(|r| &r.token);
            sink.emit(action, guard);
        }
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "effect failed, no action emitted");
        }
    }

    if let Some(registration) = registration {
        sink.release(&registration.id, registration.generation);
    }
}

async fn run_repeating<A, S>(
    registration: Registration,
    interval: Duration,
    tick: TickFn<A>,
    sink: S,
) where
    A: Send + 'static,
    S: EffectSink<A>,
{
    let Registration {
        id,
        token,
        generation,
    } = registration;
    tracing::debug!(cancel_id = %id, ?interval, "repeating effect started");

    loop {
        if token.is_cancelled() {
            break;
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        if token.is_cancelled() {
            break;
        }
        if !sink.emit(tick(), Some(&token)) {
            break;
        }
    }

    sink.release(&id, generation);
    tracing::debug!(cancel_id = %id, "repeating effect stopped");
}

/// Fire-and-forget tasks spawned by one `send`.
///
/// Awaiting [`wait`](Self::wait) resolves once every one of them finished,
/// including the `send` of the action it emitted. Dropping it detaches the
/// tasks; they keep running.
#[derive(Debug, Default)]
pub struct SendTask {
    tasks: SmallVec<[JoinHandle<()>; 2]>,
}

impl SendTask {
    /// True when the action scheduled no fire-and-forget work.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    /// Waits for the tracked tasks. A panicking effect is logged, not propagated.
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(err) = task.await {
                if err.is_panic() {
                    tracing::error!(error = %err, "effect task panicked");
                }
            }
        }
    }

    /// Aborts the tracked tasks without waiting.
    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
