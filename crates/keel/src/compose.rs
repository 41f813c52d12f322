//! Building parent features out of child reducers.

use crate::effect::Effect;
use crate::reducer::Reducer;

/// Embeds a child reducer into a parent state and action.
///
/// `state` focuses the parent state on the child's slice, `extract` picks the
/// child's actions out of the parent's (others are ignored), and `embed`
/// lifts child actions emitted by effects back into the parent. Child cancel
/// ids are prefixed with `scope`, so the same child can be embedded several
/// times without the copies cancelling each other.
pub struct Scope<R: Reducer, S, A> {
    scope: &'static str,
    child: R,
    state: fn(&mut S) -> &mut R::State,
    extract: fn(A) -> Option<R::Action>,
    embed: fn(R::Action) -> A,
}

impl<R: Reducer, S, A> Scope<R, S, A> {
    pub fn new(
        scope: &'static str,
        child: R,
        state: fn(&mut S) -> &mut R::State,
        extract: fn(A) -> Option<R::Action>,
        embed: fn(R::Action) -> A,
    ) -> Self {
        Self {
            scope,
            child,
            state,
            extract,
            embed,
        }
    }
}

impl<R, S, A> Reducer for Scope<R, S, A>
where
    R: Reducer,
    S: Send + 'static,
    A: Send + 'static,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: &mut S, action: A) -> Effect<A> {
        let Some(action) = (self.extract)(action) else {
            return Effect::none();
        };
        self.child
            .reduce((self.state)(state), action)
            .scope_cancellation(self.scope)
            .map(self.embed)
    }
}

/// Runs two reducers on the same state and action, in order.
pub struct Combine<L, R> {
    first: L,
    second: R,
}

impl<L, R> Combine<L, R> {
    pub fn new(first: L, second: R) -> Self {
        Self { first, second }
    }
}

impl<L, R> Reducer for Combine<L, R>
where
    L: Reducer,
    R: Reducer<State = L::State, Action = L::Action>,
    L::Action: Clone,
{
    type State = L::State;
    type Action = L::Action;

    fn reduce(&self, state: &mut L::State, action: L::Action) -> Effect<L::Action> {
        let first = self.first.reduce(state, action.clone());
        let second = self.second.reduce(state, action);
        Effect::merge([first, second])
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cancel::CancelId;
    use crate::reducer::{reducer_fn, ReducerExt};

    #[derive(Debug, Default, PartialEq)]
    struct Pair {
        left: i32,
        right: i32,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Child {
        Bump,
        Start,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Parent {
        Left(Child),
        Right(Child),
    }

    fn child() -> impl Reducer<State = i32, Action = Child> {
        reducer_fn(|count: &mut i32, action: Child| match action {
            Child::Bump => {
                *count += 1;
                Effect::none()
            }
            Child::Start => Effect::every(CancelId::new("timer"), Duration::from_secs(1), Child::Bump),
        })
    }

    fn left(pair: &mut Pair) -> &mut i32 {
        &mut pair.left
    }

    fn right(pair: &mut Pair) -> &mut i32 {
        &mut pair.right
    }

    fn extract_left(action: Parent) -> Option<Child> {
        match action {
            Parent::Left(action) => Some(action),
            Parent::Right(_) => None,
        }
    }

    fn extract_right(action: Parent) -> Option<Child> {
        match action {
            Parent::Right(action) => Some(action),
            Parent::Left(_) => None,
        }
    }

    fn parent() -> impl Reducer<State = Pair, Action = Parent> {
        Scope::new("left", child(), left, extract_left, Parent::Left)
            .combine(Scope::new("right", child(), right, extract_right, Parent::Right))
    }

    #[test]
    fn scoped_actions_only_touch_their_slice() {
        let reducer = parent();
        let mut state = Pair::default();

        reducer.reduce(&mut state, Parent::Left(Child::Bump));
        reducer.reduce(&mut state, Parent::Right(Child::Bump));
        reducer.reduce(&mut state, Parent::Right(Child::Bump));

        assert_eq!(state, Pair { left: 1, right: 2 });
    }

    #[test]
    fn scoped_effects_are_namespaced_and_lifted() {
        let reducer = parent();
        let mut state = Pair::default();

        match reducer.reduce(&mut state, Parent::Right(Child::Start)) {
            Effect::Repeating { id, tick, .. } => {
                assert_eq!(id.as_str(), "right/timer");
                assert_eq!(tick(), Parent::Right(Child::Bump));
            }
            other => panic!("expected Repeating, got {other:?}"),
        }
    }
}
