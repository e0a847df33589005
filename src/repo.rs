mod analytics;
mod content;
mod queue;
mod subscribers;

/// In-memory repository implementations, intended to facilitate
/// testing without a live database.
pub mod memory;

pub use analytics::{AnalyticsRepo, EventStamp, NewAnalyticsRecord, PgAnalyticsRepo};
pub use content::{ContentRepo, PgContentRepo};
pub use queue::{PgQueueRepo, QueueRepo};
pub use subscribers::{PgSubscriberRepo, SubscriberRepo};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Unique-constraint violation, keyed by the offending value
    #[error("Duplicate value: {0}")]
    Duplicate(String),
    /// A stored value could not be mapped back onto a model type
    #[error("Unexpected value in column {column}: {value}")]
    Decode { column: &'static str, value: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl RepoError {
    pub(crate) fn decode(column: &'static str, value: impl Into<String>) -> Self {
        Self::Decode {
            column,
            value: value.into(),
        }
    }
}
