//! Two independent counters side by side, one per tab.

use std::sync::Arc;
use std::time::Duration;

use keel_core::{Combine, Effect, Reducer, ReducerExt, Scope};

use crate::fact::FactClient;
use crate::feature::CounterFeature;
use crate::state::{CounterAction, CounterState};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub tab1: CounterState,
    pub tab2: CounterState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Tab1(CounterAction),
    Tab2(CounterAction),
}

type TabScope = Scope<CounterFeature, AppState, AppAction>;

/// Parent feature embedding one [`CounterFeature`] per tab.
///
/// Each tab's effects are namespaced (`tab1/timer`, `tab2/timer`), so the
/// two timers run and stop independently.
pub struct AppFeature {
    tabs: Combine<TabScope, TabScope>,
}

impl AppFeature {
    pub fn new(facts: Arc<dyn FactClient>) -> Self {
        Self::from_counter(CounterFeature::new(facts))
    }

    pub fn with_timer_interval(facts: Arc<dyn FactClient>, interval: Duration) -> Self {
        Self::from_counter(CounterFeature::new(facts).with_timer_interval(interval))
    }

    /// Uses clones of `counter` for both tabs.
    pub fn from_counter(counter: CounterFeature) -> Self {
        let tab1: TabScope = Scope::new("tab1", counter.clone(), tab1_state, tab1_action, AppAction::Tab1);
        let tab2: TabScope = Scope::new("tab2", counter, tab2_state, tab2_action, AppAction::Tab2);
        Self {
            tabs: tab1.combine(tab2),
        }
    }
}

impl Reducer for AppFeature {
    type State = AppState;
    type Action = AppAction;

    fn reduce(&self, state: &mut AppState, action: AppAction) -> Effect<AppAction> {
        // The parent adds no behavior of its own; everything is delegated to the tabs.
        self.tabs.reduce(state, action)
    }
}

fn tab1_state(state: &mut AppState) -> &mut CounterState {
    &mut state.tab1
}

fn tab2_state(state: &mut AppState) -> &mut CounterState {
    &mut state.tab2
}

fn tab1_action(action: AppAction) -> Option<CounterAction> {
    match action {
        AppAction::Tab1(action) => Some(action),
        AppAction::Tab2(_) => None,
    }
}

fn tab2_action(action: AppAction) -> Option<CounterAction> {
    match action {
        AppAction::Tab2(action) => Some(action),
        AppAction::Tab1(_) => None,
    }
}
