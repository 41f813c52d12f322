//! Counter feature configuration.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::fact::FactError;

/// Endpoint answering with a plain-text fact about `{n}`.
pub const DEFAULT_FACT_URL_TEMPLATE: &str = "http://numbersapi.com/{n}";

/// Placeholder replaced by the counter value in the fact URL template.
pub const NUMBER_PLACEHOLDER: &str = "{n}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("timer interval must be greater than zero")]
    ZeroTimerInterval,

    #[error(transparent)]
    Fact(#[from] FactError),
}

/// Settings for [`CounterFeature`](crate::CounterFeature).
///
/// Deserializes from any serde format; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// URL of the fact service, with `{n}` where the number goes.
    pub fact_url_template: String,
    /// Time between two timer ticks.
    pub timer_interval_ms: u64,
    /// Timeout applied to each fact request.
    pub request_timeout_ms: u64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            fact_url_template: DEFAULT_FACT_URL_TEMPLATE.to_string(),
            timer_interval_ms: 1_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl CounterConfig {
    pub fn with_fact_url_template(mut self, template: impl Into<String>) -> Self {
        self.fact_url_template = template.into();
        self
    }

    pub fn with_timer_interval(mut self, interval: Duration) -> Self {
        self.timer_interval_ms = saturating_millis(interval);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = saturating_millis(timeout);
        self
    }

    pub fn timer_interval(&self) -> Duration {
        Duration::from_millis(self.timer_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Rejects settings the feature cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timer_interval_ms == 0 {
            return Err(ConfigError::ZeroTimerInterval);
        }
        Ok(())
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
