//! The counter reducer.

use std::sync::Arc;
use std::time::Duration;

use keel_core::{CancelId, Effect, Reducer};

use crate::config::{ConfigError, CounterConfig};
use crate::fact::{FactClient, NumbersApiClient};
use crate::state::{CounterAction, CounterState};

/// Cancel id of the repeating timer.
pub const TIMER_ID: CancelId = CancelId::new("timer");

/// Counter with a fact fetch and a repeating timer.
///
/// | Action | State | Effect |
/// |---|---|---|
/// | `Decrement` | count - 1, fact cleared | none |
/// | `Increment` / `TimerTick` | count + 1, fact cleared | none |
/// | `RequestFact` | fact cleared, loading | fetch fact for the current count |
/// | `FactReceived(text)` | fact = text, not loading | none |
/// | `FactFailed(reason)` | not loading | none |
/// | `ToggleTimer` | timer flag flipped | start or cancel the `timer` effect |
///
/// The fetch captures the count when it is requested. A response is applied
/// even if the count changed meanwhile.
#[derive(Clone)]
pub struct CounterFeature {
    facts: Arc<dyn FactClient>,
    timer_interval: Duration,
}

impl CounterFeature {
    pub fn new(facts: Arc<dyn FactClient>) -> Self {
        Self {
            facts,
            timer_interval: CounterConfig::default().timer_interval(),
        }
    }

    /// Builds the feature with an HTTP fact client configured from `config`.
    pub fn from_config(config: &CounterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let facts = NumbersApiClient::new(config)?;
        Ok(Self::new(Arc::new(facts)).with_timer_interval(config.timer_interval()))
    }

    pub fn with_timer_interval(mut self, interval: Duration) -> Self {
        self.timer_interval = interval;
        self
    }

    fn fetch_fact(&self, count: i64) -> Effect<CounterAction> {
        let facts = Arc::clone(&self.facts);
        Effect::run(async move {
            match facts.fetch(count).await {
                Ok(fact) => Ok(Some(CounterAction::FactReceived(fact))),
                Err(err) => {
                    tracing::warn!(count, error = %err, "number fact fetch failed");
                    Ok(Some(CounterAction::FactFailed(err.to_string())))
                }
            }
        })
    }
}

impl Reducer for CounterFeature {
    type State = CounterState;
    type Action = CounterAction;

    fn reduce(&self, state: &mut CounterState, action: CounterAction) -> Effect<CounterAction> {
        match action {
            CounterAction::Decrement => {
                state.count -= 1;
                state.fact = None;
                Effect::none()
            }
            CounterAction::Increment | CounterAction::TimerTick => {
                state.count += 1;
                state.fact = None;
                Effect::none()
            }
            CounterAction::RequestFact => {
                state.fact = None;
                state.is_loading = true;
                self.fetch_fact(state.count)
            }
            CounterAction::FactReceived(fact) => {
                state.fact = Some(fact);
                state.is_loading = false;
                Effect::none()
            }
            CounterAction::FactFailed(_) => {
                state.is_loading = false;
                Effect::none()
            }
            CounterAction::ToggleTimer => {
                state.is_timer_running = !state.is_timer_running;
                if state.is_timer_running {
                    Effect::every(TIMER_ID, self.timer_interval, CounterAction::TimerTick)
                } else {
                    Effect::cancel(TIMER_ID)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::FactError;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl FactClient for Unreachable {
        async fn fetch(&self, _number: i64) -> Result<String, FactError> {
            Err(FactError::Status(503))
        }
    }

    fn feature() -> CounterFeature {
        CounterFeature::new(Arc::new(Unreachable))
    }

    #[test]
    fn increment_and_decrement_clear_fact() {
        let feature = feature();
        let mut state = CounterState {
            count: 5,
            fact: Some("5 is odd".into()),
            ..CounterState::default()
        };

        assert!(feature.reduce(&mut state, CounterAction::Increment).is_none());
        assert_eq!(state.count, 6);
        assert_eq!(state.fact, None);

        state.fact = Some("6 is even".into());
        feature.reduce(&mut state, CounterAction::Decrement);
        assert_eq!(state.count, 5);
        assert_eq!(state.fact, None);
    }

    #[test]
    fn random_sequences_sum_up() {
        let feature = feature();
        for _ in 0..32 {
            let mut state = CounterState::default();
            let mut expected = 0i64;
            for _ in 0..fastrand::usize(0..200) {
                if fastrand::bool() {
                    feature.reduce(&mut state, CounterAction::Increment);
                    expected += 1;
                } else {
                    feature.reduce(&mut state, CounterAction::Decrement);
                    expected -= 1;
                }
                assert_eq!(state.fact, None);
            }
            assert_eq!(state.count, expected);
        }
    }

    #[test]
    fn toggle_timer_starts_then_cancels() {
        let feature = feature().with_timer_interval(Duration::from_millis(250));
        let mut state = CounterState::default();

        match feature.reduce(&mut state, CounterAction::ToggleTimer) {
            Effect::Repeating { id, interval, tick } => {
                assert_eq!(id, TIMER_ID);
                assert_eq!(interval, Duration::from_millis(250));
                assert_eq!(tick(), CounterAction::TimerTick);
            }
            other => panic!("expected Repeating, got {other:?}"),
        }
        assert!(state.is_timer_running);

        let effect = feature.reduce(&mut state, CounterAction::ToggleTimer);
        assert!(matches!(effect, Effect::Cancel(id) if id == TIMER_ID));
        assert!(!state.is_timer_running);
    }

    #[test]
    fn from_config_rejects_zero_timer_interval() {
        let config = CounterConfig {
            timer_interval_ms: 0,
            ..CounterConfig::default()
        };
        assert!(matches!(
            CounterFeature::from_config(&config),
            Err(ConfigError::ZeroTimerInterval)
        ));

        let config = CounterConfig::default().with_fact_url_template("http://localhost/facts");
        assert!(matches!(
            CounterFeature::from_config(&config),
            Err(ConfigError::Fact(FactError::InvalidTemplate(_)))
        ));
    }

    #[tokio::test]
    async fn failed_fetch_maps_to_fact_failed() {
        let feature = feature();
        let mut state = CounterState::default();

        let Effect::Run { work, cancel_id } = feature.reduce(&mut state, CounterAction::RequestFact)
        else {
            panic!("expected Run");
        };
        assert!(state.is_loading);
        assert!(cancel_id.is_none());
        assert_eq!(
            work.await.unwrap(),
            Some(CounterAction::FactFailed("fact service answered with HTTP 503".into()))
        );
    }
}
