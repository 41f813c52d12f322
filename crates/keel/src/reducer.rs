//! The reducer contract.

use std::marker::PhantomData;

use crate::compose::Combine;
use crate::effect::Effect;
use crate::log::LogChanges;

/// Pure state transition: `(state, action) -> (state', effect)`.
///
/// Reducers mutate the state they are handed and return the effect to run.
/// They must return immediately; anything that waits belongs in the effect.
/// Values an effect needs from the state are copied into it at this point.
pub trait Reducer: Send + Sync + 'static {
    type State: Send + 'static;
    type Action: Send + 'static;

    fn reduce(&self, state: &mut Self::State, action: Self::Action) -> Effect<Self::Action>;
}

/// Adapters available on every reducer.
pub trait ReducerExt: Reducer + Sized {
    /// Logs every action and the state change it caused at `debug` level.
    fn log_changes(self, feature: &'static str) -> LogChanges<Self> {
        LogChanges::new(self, feature)
    }

    /// Runs `self` and then `other` on the same action, merging their effects.
    fn combine<R>(self, other: R) -> Combine<Self, R>
    where
        R: Reducer<State = Self::State, Action = Self::Action>,
        Self::Action: Clone,
    {
        Combine::new(self, other)
    }
}

impl<R: Reducer> ReducerExt for R {}

/// Reducer built from a closure. Mostly useful in tests and small features.
pub struct FnReducer<S, A, F> {
    f: F,
    _marker: PhantomData<fn(&mut S, A)>,
}

/// Wraps a closure as a [`Reducer`].
pub fn reducer_fn<S, A, F>(f: F) -> FnReducer<S, A, F>
where
    F: Fn(&mut S, A) -> Effect<A> + Send + Sync + 'static,
{
    FnReducer {
        f,
        _marker: PhantomData,
    }
}

impl<S, A, F> Reducer for FnReducer<S, A, F>
where
    S: Send + 'static,
    A: Send + 'static,
    F: Fn(&mut S, A) -> Effect<A> + Send + Sync + 'static,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: &mut S, action: A) -> Effect<A> {
        (self.f)(state, action)
    }
}
