//! Errors surfaced by the store runtime.
//!
//! Effect failures are not errors of the store: they are logged and, when a
//! feature cares, converted into actions by the effect itself.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum KeelError {
    /// The store was shut down; it no longer accepts actions.
    #[error("store {0} has been shut down")]
    StoreClosed(Uuid),

    /// The action needs a task but the store has no tokio runtime. The
    /// action was not applied.
    #[error("store has no tokio runtime to run effects on")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, KeelError>;
