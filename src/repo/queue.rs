use chrono::{DateTime, Utc};

use sqlx::PgPool;

use uuid::Uuid;

use crate::model::EmailQueueItem;

use super::{RepoError, RepoResult};

/// Email queue repository trait.
/// The queue processor is the only writer; items are created externally
/// when content is published and never deleted here.
#[async_trait::async_trait]
pub trait QueueRepo: Send + Sync {
    /// Fetch pending items that have not exhausted their retries,
    /// oldest scheduled first, capped at `limit`
    async fn fetch_eligible(&self, max_retries: i32, limit: i64)
        -> RepoResult<Vec<EmailQueueItem>>;

    /// Fetch specific items regardless of status or retry count.
    /// Supports manual "retry"/"send now" actions.
    async fn fetch_by_ids(&self, ids: &[Uuid]) -> RepoResult<Vec<EmailQueueItem>>;

    /// Transition an item to `processing`
    async fn mark_processing(&self, id: Uuid) -> RepoResult<()>;

    /// Transition an item to `sent`, clearing any previous error
    async fn mark_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> RepoResult<()>;

    /// Transition an item to `failed`, incrementing its retry count
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> RepoResult<()>;
}

#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    id: Uuid,
    content_type: String,
    content_id: Uuid,
    status: String,
    scheduled_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    retry_count: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<QueueRow> for EmailQueueItem {
    type Error = RepoError;

    fn try_from(row: QueueRow) -> RepoResult<Self> {
        let content_type = row
            .content_type
            .parse()
            .map_err(|_| RepoError::decode("content_type", row.content_type.clone()))?;
        let status = row
            .status
            .parse()
            .map_err(|_| RepoError::decode("status", row.status.clone()))?;

        Ok(Self {
            id: row.id,
            content_type,
            content_id: row.content_id,
            status,
            scheduled_at: row.scheduled_at,
            sent_at: row.sent_at,
            error_message: row.error_message,
            retry_count: row.retry_count,
            created_at: row.created_at,
        })
    }
}

const QUEUE_COLUMNS: &str = "id, content_type, content_id, status, scheduled_at, sent_at, \
                             error_message, retry_count, created_at";

/// Postgres email queue repository
#[derive(Debug, Clone)]
pub struct PgQueueRepo {
    pool: PgPool,
}

impl PgQueueRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QueueRepo for PgQueueRepo {
    #[tracing::instrument(name = "Fetch eligible queue items", skip(self))]
    async fn fetch_eligible(
        &self,
        max_retries: i32,
        limit: i64,
    ) -> RepoResult<Vec<EmailQueueItem>> {
        let rows = sqlx::query_as::<_, QueueRow>(&format!(
            "select {} from email_queue
             where status = 'pending' and retry_count < $1
             order by scheduled_at asc limit $2",
            QUEUE_COLUMNS
        ))
        .bind(max_retries)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EmailQueueItem::try_from).collect()
    }

    #[tracing::instrument(name = "Fetch queue items by id", skip(self))]
    async fn fetch_by_ids(&self, ids: &[Uuid]) -> RepoResult<Vec<EmailQueueItem>> {
        let rows = sqlx::query_as::<_, QueueRow>(&format!(
            "select {} from email_queue where id = any($1) order by scheduled_at asc",
            QUEUE_COLUMNS
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EmailQueueItem::try_from).collect()
    }

    #[tracing::instrument(name = "Mark queue item processing", skip(self))]
    async fn mark_processing(&self, id: Uuid) -> RepoResult<()> {
        sqlx::query("update email_queue set status = 'processing' where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(name = "Mark queue item sent", skip(self))]
    async fn mark_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query(
            "update email_queue set status = 'sent', sent_at = $2, error_message = null
             where id = $1",
        )
        .bind(id)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(name = "Mark queue item failed", skip(self))]
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> RepoResult<()> {
        sqlx::query(
            "update email_queue
             set status = 'failed', retry_count = retry_count + 1, error_message = $2
             where id = $1",
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
