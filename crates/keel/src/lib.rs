//! # Keel
//!
//! A single-writer state container where reducers decide, effects execute,
//! and cancel ids define how long effects live.
//!
//! ## Core Concepts
//!
//! - **State**: plain data owned by exactly one [`Store`]
//! - **Action**: an immutable description of something that happened
//! - [`Reducer`]: pure `(state, action) -> (state', effect)`
//! - [`Effect`]: a description of async work, optionally tagged with a [`CancelId`]
//!
//! ## Architecture
//!
//! ```text
//! Edge (UI / caller)
//!     │
//!     ▼ send()
//! Store ──── lock ────────────────────────────────┐
//!     │                                           │
//!     ├─► Reducer.reduce(&mut state, action)      │
//!     │        │                                  │
//!     │        └─► Effect ─► EffectPlan::prepare  │
//!     │                      (cancel / register)  │
//!     ├─► publish snapshot (watch)                │
//!     └──────────── unlock ───────────────────────┘
//!                     │
//!                     ▼ EffectPlan::spawn
//!        Run ────────► task ─► Some(action) ─► send()
//!        Repeating ──► loop { wait; send(tick) } until cancelled
//! ```
//!
//! ## Key Invariants
//!
//! 1. **One writer** - every reducer call happens under the store lock
//! 2. **Reducers never wait** - anything async is returned as an [`Effect`]
//! 3. **Effects talk through `send`** - they never touch state directly
//! 4. **One effect per cancel id** - starting another supersedes the first
//! 5. **Cooperative cancellation** - checked before each wait and each emitted action
//!
//! ## Example
//!
//! ```ignore
//! use keel_core::{CancelId, Effect, Reducer, Store};
//! use std::time::Duration;
//!
//! const TIMER: CancelId = CancelId::new("timer");
//!
//! #[derive(Debug, Clone, Default)]
//! struct State { ticks: u64, running: bool }
//!
//! #[derive(Debug, Clone)]
//! enum Action { Toggle, Tick }
//!
//! struct Clock;
//!
//! impl Reducer for Clock {
//!     type State = State;
//!     type Action = Action;
//!
//!     fn reduce(&self, state: &mut State, action: Action) -> Effect<Action> {
//!         match action {
//!             Action::Tick => {
//!                 state.ticks += 1;
//!                 Effect::none()
//!             }
//!             Action::Toggle => {
//!                 state.running = !state.running;
//!                 if state.running {
//!                     Effect::every(TIMER, Duration::from_secs(1), Action::Tick)
//!                 } else {
//!                     Effect::cancel(TIMER)
//!                 }
//!             }
//!         }
//!     }
//! }
//!
//! let store = Store::new(State::default(), Clock);
//! store.send(Action::Toggle);
//! ```

// Core modules
mod cancel;
mod compose;
mod effect;
mod error;
mod log;
mod reducer;
mod schedule;
mod store;


// Re-export cancellation types
pub use cancel::{CancelId, CancelToken, CancellationRegistry, Registration};

// Re-export effect types
pub use effect::{Completion, Effect, EffectFuture, TickFn};

// Re-export error types
pub use error::{KeelError, Result};

// Re-export reducer types
pub use compose::{Combine, Scope};
pub use log::LogChanges;
pub use reducer::{reducer_fn, FnReducer, Reducer, ReducerExt};

// Re-export runtime types
pub use schedule::{EffectPlan, EffectSink, SendTask};
pub use store::Store;
