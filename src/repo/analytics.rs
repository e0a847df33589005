use chrono::{DateTime, Utc};

use sqlx::PgPool;

use uuid::Uuid;

use crate::model::EmailAnalyticsRecord;

use super::RepoResult;

/// Which delivery-event timestamp to write on an analytics record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStamp {
    Delivered,
    Opened,
    Clicked,
    Bounced,
    Unsubscribed,
}

impl EventStamp {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered_at",
            Self::Opened => "opened_at",
            Self::Clicked => "clicked_at",
            Self::Bounced => "bounced_at",
            Self::Unsubscribed => "unsubscribed_at",
        }
    }
}

/// Analytics row created right after a successful send
#[derive(Debug)]
pub struct NewAnalyticsRecord {
    pub email_queue_id: Uuid,
    pub subscriber_email: String,
    pub sent_at: DateTime<Utc>,
}

/// Per-send delivery analytics repository.
/// Inbound delivery events carry only a recipient address, so lookups are
/// by email and recency rather than by a stable foreign key.
#[async_trait::async_trait]
pub trait AnalyticsRepo: Send + Sync {
    async fn insert(&self, record: &NewAnalyticsRecord) -> RepoResult<Uuid>;

    /// Most recent record for an email that has not been marked delivered
    async fn latest_undelivered_for_email(
        &self,
        email: &str,
    ) -> RepoResult<Option<EmailAnalyticsRecord>>;

    /// Most recent record for an email regardless of delivery state
    async fn latest_for_email(&self, email: &str) -> RepoResult<Option<EmailAnalyticsRecord>>;

    /// Most recent record for an email created at or after `since`.
    /// Used to attribute an unsubscribe to the triggering email.
    async fn latest_since_for_email(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> RepoResult<Option<EmailAnalyticsRecord>>;

    /// Write one event timestamp, overwriting any previous value
    /// (last-write-wins, see the webhook handler)
    async fn stamp(&self, id: Uuid, stamp: EventStamp, at: DateTime<Utc>) -> RepoResult<()>;
}

#[derive(Debug, sqlx::FromRow)]
struct AnalyticsRow {
    id: Uuid,
    email_queue_id: Uuid,
    subscriber_email: String,
    sent_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
    opened_at: Option<DateTime<Utc>>,
    clicked_at: Option<DateTime<Utc>>,
    bounced_at: Option<DateTime<Utc>>,
    unsubscribed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<AnalyticsRow> for EmailAnalyticsRecord {
    fn from(row: AnalyticsRow) -> Self {
        Self {
            id: row.id,
            email_queue_id: row.email_queue_id,
            subscriber_email: row.subscriber_email,
            sent_at: row.sent_at,
            delivered_at: row.delivered_at,
            opened_at: row.opened_at,
            clicked_at: row.clicked_at,
            bounced_at: row.bounced_at,
            unsubscribed_at: row.unsubscribed_at,
            created_at: row.created_at,
        }
    }
}

const ANALYTICS_COLUMNS: &str = "id, email_queue_id, subscriber_email, sent_at, delivered_at, \
                                 opened_at, clicked_at, bounced_at, unsubscribed_at, created_at";

/// Postgres analytics repository
#[derive(Debug, Clone)]
pub struct PgAnalyticsRepo {
    pool: PgPool,
}

impl PgAnalyticsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AnalyticsRepo for PgAnalyticsRepo {
    #[tracing::instrument(name = "Insert analytics record", skip(self))]
    async fn insert(&self, record: &NewAnalyticsRecord) -> RepoResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "insert into email_analytics (email_queue_id, subscriber_email, sent_at)
             values ($1, $2, $3) returning id",
        )
        .bind(record.email_queue_id)
        .bind(&record.subscriber_email)
        .bind(record.sent_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    #[tracing::instrument(name = "Find latest undelivered record", skip(self))]
    async fn latest_undelivered_for_email(
        &self,
        email: &str,
    ) -> RepoResult<Option<EmailAnalyticsRecord>> {
        let row = sqlx::query_as::<_, AnalyticsRow>(&format!(
            "select {} from email_analytics
             where subscriber_email = $1 and delivered_at is null
             order by created_at desc limit 1",
            ANALYTICS_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EmailAnalyticsRecord::from))
    }

    #[tracing::instrument(name = "Find latest record", skip(self))]
    async fn latest_for_email(&self, email: &str) -> RepoResult<Option<EmailAnalyticsRecord>> {
        let row = sqlx::query_as::<_, AnalyticsRow>(&format!(
            "select {} from email_analytics
             where subscriber_email = $1
             order by created_at desc limit 1",
            ANALYTICS_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EmailAnalyticsRecord::from))
    }

    #[tracing::instrument(name = "Find latest record since", skip(self))]
    async fn latest_since_for_email(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> RepoResult<Option<EmailAnalyticsRecord>> {
        let row = sqlx::query_as::<_, AnalyticsRow>(&format!(
            "select {} from email_analytics
             where subscriber_email = $1 and created_at >= $2
             order by created_at desc limit 1",
            ANALYTICS_COLUMNS
        ))
        .bind(email)
        .bind(since)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EmailAnalyticsRecord::from))
    }

    #[tracing::instrument(name = "Stamp analytics record", skip(self))]
    async fn stamp(&self, id: Uuid, stamp: EventStamp, at: DateTime<Utc>) -> RepoResult<()> {
        // Column name comes from a fixed enum, not user input
        let sql = format!(
            "update email_analytics set {} = $2 where id = $1",
            stamp.column()
        );
        sqlx::query(&sql).bind(id).bind(at).execute(&self.pool).await?;
        Ok(())
    }
}
