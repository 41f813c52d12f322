#![allow(dead_code)]

use async_trait::async_trait;
use keel_counter::{FactClient, FactError};
use tokio::sync::Semaphore;

/// Answers immediately with the parity of the number.
pub struct ParityFacts;

#[async_trait]
impl FactClient for ParityFacts {
    async fn fetch(&self, number: i64) -> Result<String, FactError> {
        let parity = if number % 2 == 0 { "even" } else { "odd" };
        Ok(format!("{number} is an {parity} number"))
    }
}

/// Always fails as if the service were down.
pub struct DownFacts;

#[async_trait]
impl FactClient for DownFacts {
    async fn fetch(&self, _number: i64) -> Result<String, FactError> {
        Err(FactError::Status(503))
    }
}

/// Holds every fetch until the test hands out a permit.
pub struct GatedFacts {
    permits: Semaphore,
}

impl GatedFacts {
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(0),
        }
    }

    pub fn release_one(&self) {
        self.permits.add_permits(1);
    }
}

#[async_trait]
impl FactClient for GatedFacts {
    async fn fetch(&self, number: i64) -> Result<String, FactError> {
        match self.permits.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => return Err(FactError::Status(499)),
        }
        Ok(format!("{number} is a fact"))
    }
}
