//! Action and state-change logging for reducers.

use std::fmt::Debug;

use tracing::Level;

use crate::effect::Effect;
use crate::reducer::Reducer;

/// Wraps a reducer and logs each action with the state change it caused.
///
/// Logging happens at `debug` level under the `feature` field. When that
/// level is disabled the wrapper costs one `enabled!` check per action.
pub struct LogChanges<R> {
    inner: R,
    feature: &'static str,
}

impl<R> LogChanges<R> {
    pub fn new(inner: R, feature: &'static str) -> Self {
        Self { inner, feature }
    }
}

impl<R> Reducer for LogChanges<R>
where
    R: Reducer,
    R::State: Clone + PartialEq + Debug,
    R::Action: Debug,
{
    type State = R::State;
    type Action = R::Action;

    fn reduce(&self, state: &mut R::State, action: R::Action) -> Effect<R::Action> {
        if !tracing::enabled!(Level::DEBUG) {
            return self.inner.reduce(state, action);
        }

        let received = format!("{action:?}");
        let before = state.clone();
        let effect = self.inner.reduce(state, action);

        if *state == before {
            tracing::debug!(feature = self.feature, action = %received, "state unchanged");
        } else {
            tracing::debug!(
                feature = self.feature,
                action = %received,
                before = ?before,
                after = ?state,
                "state changed"
            );
        }
        if !effect.is_none() {
            tracing::debug!(feature = self.feature, effect = ?effect, "effect returned");
        }
        effect
    }
}
