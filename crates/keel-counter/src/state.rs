//! Counter state and actions.

/// State of one counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterState {
    pub count: i64,
    /// Last fetched fact. Cleared whenever `count` changes.
    pub fact: Option<String>,
    /// True between `RequestFact` and its response.
    pub is_loading: bool,
    pub is_timer_running: bool,
}

/// Everything that can happen to a counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterAction {
    Decrement,
    Increment,
    /// Fetch a fact about the current count.
    RequestFact,
    /// A fact fetch completed.
    FactReceived(String),
    /// A fact fetch failed; carries the reason.
    FactFailed(String),
    /// One timer interval elapsed.
    TimerTick,
    /// Starts the timer if stopped, stops it if running.
    ToggleTimer,
}
