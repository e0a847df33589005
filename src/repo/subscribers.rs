use chrono::{DateTime, Utc};

use sqlx::PgPool;

use uuid::Uuid;

use crate::model::{NewSubscriber, Subscriber, SubscriberStatus};

use super::{RepoError, RepoResult};

/// Subscriber repository trait, must be implemented for each store used.
/// NOTE: Object-safe so handlers can hold `Arc<dyn SubscriberRepo>`
/// TODO: Swap async-trait for std async traits when those become stable
/// https://github.com/orgs/rust-lang/projects/28/views/2?pane=issue&itemId=21990165
#[async_trait::async_trait]
pub trait SubscriberRepo: Send + Sync {
    /// Insert a new subscriber; a unique violation on the email column
    /// surfaces as `RepoError::Duplicate` ("already subscribed")
    async fn insert(&self, new_subscriber: &NewSubscriber) -> RepoResult<Uuid>;

    /// Fetch all subscribers eligible to receive new-content emails
    async fn fetch_active(&self) -> RepoResult<Vec<Subscriber>>;

    /// Resolve a subscriber by their unsubscribe token
    async fn find_by_token(&self, token: &str) -> RepoResult<Option<Subscriber>>;

    /// Update a subscriber's status by id
    async fn set_status(
        &self,
        id: Uuid,
        status: SubscriberStatus,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<()>;

    /// Update a subscriber's status by email (bounce/complaint processing)
    async fn set_status_by_email(
        &self,
        email: &str,
        status: SubscriberStatus,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<()>;
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    status: String,
    unsubscribe_token: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = RepoError;

    fn try_from(row: SubscriberRow) -> RepoResult<Self> {
        let status = row
            .status
            .parse()
            .map_err(|_| RepoError::decode("status", row.status.clone()))?;

        Ok(Self {
            id: row.id,
            email: row.email,
            status,
            unsubscribe_token: row.unsubscribe_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SUBSCRIBER_COLUMNS: &str = "id, email, status, unsubscribe_token, created_at, updated_at";

/// Postgres subscriber repository
#[derive(Debug, Clone)]
pub struct PgSubscriberRepo {
    pool: PgPool,
}

impl PgSubscriberRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SubscriberRepo for PgSubscriberRepo {
    #[tracing::instrument(name = "Insert subscriber", skip(self))]
    async fn insert(&self, new_subscriber: &NewSubscriber) -> RepoResult<Uuid> {
        let result = sqlx::query_scalar::<_, Uuid>(
            "insert into newsletter_subscribers (email, status, unsubscribe_token)
             values ($1, 'active', $2) returning id",
        )
        .bind(new_subscriber.email.as_ref())
        .bind(&new_subscriber.unsubscribe_token)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => Ok(id),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(RepoError::Duplicate(new_subscriber.email.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(name = "Fetch all active subscribers", skip(self))]
    async fn fetch_active(&self) -> RepoResult<Vec<Subscriber>> {
        let rows = sqlx::query_as::<_, SubscriberRow>(&format!(
            "select {} from newsletter_subscribers where status = 'active' order by created_at",
            SUBSCRIBER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Subscriber::try_from).collect()
    }

    #[tracing::instrument(name = "Find subscriber by token", skip(self, token))]
    async fn find_by_token(&self, token: &str) -> RepoResult<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "select {} from newsletter_subscribers where unsubscribe_token = $1",
            SUBSCRIBER_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Subscriber::try_from).transpose()
    }

    #[tracing::instrument(name = "Update subscriber status", skip(self))]
    async fn set_status(
        &self,
        id: Uuid,
        status: SubscriberStatus,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        sqlx::query("update newsletter_subscribers set status = $2, updated_at = $3 where id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(name = "Update subscriber status by email", skip(self))]
    async fn set_status_by_email(
        &self,
        email: &str,
        status: SubscriberStatus,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        sqlx::query(
            "update newsletter_subscribers set status = $2, updated_at = $3 where email = $1",
        )
        .bind(email)
        .bind(status.as_str())
        .bind(updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
