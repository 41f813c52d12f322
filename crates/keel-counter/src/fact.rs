//! Number facts over HTTP.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{CounterConfig, NUMBER_PLACEHOLDER};

#[derive(Debug, Error)]
pub enum FactError {
    #[error("fact request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("fact service answered with HTTP {0}")]
    Status(u16),

    #[error("fact response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("fact url template {0:?} has no {{n}} placeholder")]
    InvalidTemplate(String),
}

/// Source of facts about numbers.
#[async_trait]
pub trait FactClient: Send + Sync + 'static {
    async fn fetch(&self, number: i64) -> Result<String, FactError>;
}

/// [`FactClient`] backed by a plain-text HTTP endpoint such as numbersapi.com.
#[derive(Debug, Clone)]
pub struct NumbersApiClient {
    http: reqwest::Client,
    template: String,
}

impl NumbersApiClient {
    /// Builds a client with the template and request timeout from `config`.
    pub fn new(config: &CounterConfig) -> Result<Self, FactError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(FactError::Request)?;
        Self::with_client(http, &config.fact_url_template)
    }

    /// Uses an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, template: &str) -> Result<Self, FactError> {
        if !template.contains(NUMBER_PLACEHOLDER) {
            return Err(FactError::InvalidTemplate(template.to_string()));
        }
        Ok(Self {
            http,
            template: template.to_string(),
        })
    }

    pub fn url_for(&self, number: i64) -> String {
        self.template.replace(NUMBER_PLACEHOLDER, &number.to_string())
    }
}

#[async_trait]
impl FactClient for NumbersApiClient {
    async fn fetch(&self, number: i64) -> Result<String, FactError> {
        let url = self.url_for(number);
        tracing::debug!(%url, "fetching number fact");

        let response = self.http.get(&url).send().await.map_err(FactError::Request)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FactError::Status(status.as_u16()));
        }

        response.text().await.map_err(FactError::Decode)
    }
}
