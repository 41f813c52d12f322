//! Cancellation identifiers, tokens, and the per-store registry.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Identifier under which at most one effect may be active.
///
/// Starting a second effect under the same id supersedes the first.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CancelId(Cow<'static, str>);

impl CancelId {
    /// Creates an id from a static name. Usable in `const` items.
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates an id from a runtime-built name.
    pub fn owned(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespaces this id under `scope`, e.g. `timer` becomes `tab1/timer`.
    pub fn scoped(&self, scope: &str) -> Self {
        Self::owned(format!("{scope}/{}", self.0))
    }
}

impl fmt::Debug for CancelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CancelId({})", self.0)
    }
}

impl fmt::Display for CancelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for CancelId {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation token.
///
/// Cloning is cheap; every clone observes the same flag. Effects check
/// [`is_cancelled`](Self::is_cancelled) at their yield points and may race
/// their waits against [`cancelled`](Self::cancelled).
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            state: Arc::new(CancelState {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Flags the token and wakes every pending [`cancelled`](Self::cancelled) future.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
        self.state.notify.notify_waiters();
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once the token has been cancelled.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag check so a concurrent cancel is not missed.
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// A live slot in the registry, handed to the task that runs the effect.
#[derive(Debug, Clone)]
pub struct Registration {
    pub id: CancelId,
    pub token: CancelToken,
    pub generation: u64,
}

struct Slot {
    token: CancelToken,
    generation: u64,
}

/// Maps each [`CancelId`] to the token of the effect currently holding it.
///
/// The owner mutates the registry under the same lock that guards its
/// state. Generations make sure a finishing effect only clears its own slot,
/// never the one of the effect that replaced it.
#[derive(Default)]
pub struct CancellationRegistry {
    slots: HashMap<CancelId, Slot>,
    next_generation: u64,
}

impl fmt::Debug for CancellationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationRegistry")
            .field("active", &self.ids())
            .finish()
    }
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `id` for a new effect, cancelling whichever effect held it.
    pub fn register(&mut self, id: CancelId) -> Registration {
        let token = CancelToken::new();
        self.next_generation += 1;
        let generation = self.next_generation;

        let previous = self.slots.insert(
            id.clone(),
            Slot {
                token: token.clone(),
                generation,
            },
        );
        if let Some(previous) = previous {
            tracing::debug!(cancel_id = %id, "superseding in-flight effect");
            previous.token.cancel();
        }

        Registration {
            id,
            token,
            generation,
        }
    }

    /// Signals the effect registered under `id` and frees the slot.
    ///
    /// Returns `false` when nothing was registered; that is not an error.
    pub fn cancel(&mut self, id: &CancelId) -> bool {
        match self.slots.remove(id) {
            Some(slot) => {
                tracing::debug!(cancel_id = %id, "cancelling effect");
                slot.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Frees `id` if it is still held by `generation`.
    pub fn release(&mut self, id: &CancelId, generation: u64) {
        if self
            .slots
            .get(id)
            .is_some_and(|slot| slot.generation == generation)
        {
            self.slots.remove(id);
        }
    }

    /// Cancels every registered effect. Returns how many were signalled.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.slots.len();
        for (_, slot) in self.slots.drain() {
            slot.token.cancel();
        }
        count
    }

    pub fn contains(&self, id: &CancelId) -> bool {
        self.slots.contains_key(id)
    }

    /// Ids of the effects currently registered, sorted.
    pub fn ids(&self) -> Vec<CancelId> {
        let mut ids: Vec<_> = self.slots.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
