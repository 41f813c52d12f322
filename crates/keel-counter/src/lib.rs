//! # Keel Counter
//!
//! A counter feature built on [`keel_core`]: increment and decrement, fetch a
//! fact about the current number, and run a timer that increments once per
//! interval.
//!
//! ```text
//! send(RequestFact) ──► CounterFeature.reduce ──► is_loading = true
//!                                  │
//!                                  └─► Effect::run(fetch(count))
//!                                              │
//!                  send(FactReceived | FactFailed) ◄┘
//!
//! send(ToggleTimer) ──► Effect::every("timer", 1s, TimerTick)
//! send(ToggleTimer) ──► Effect::cancel("timer")
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use keel_core::{ReducerExt, Store};
//! use keel_counter::{CounterAction, CounterConfig, CounterFeature, CounterState};
//!
//! let feature = CounterFeature::from_config(&CounterConfig::default())?;
//! let store = Store::new(CounterState::default(), feature.log_changes("counter"));
//!
//! store.send(CounterAction::Increment);
//! store.send(CounterAction::RequestFact).wait().await;
//! println!("{:?}", store.state().fact);
//! ```

mod app;
mod config;
mod fact;
mod feature;
mod state;

pub use app::{AppAction, AppFeature, AppState};
pub use config::{ConfigError, CounterConfig, DEFAULT_FACT_URL_TEMPLATE, NUMBER_PLACEHOLDER};
pub use fact::{FactClient, FactError, NumbersApiClient};
pub use feature::{CounterFeature, TIMER_ID};
pub use state::{CounterAction, CounterState};
