use chrono::{DateTime, Utc};

use tokio::sync::RwLock;

use uuid::Uuid;

use crate::model::{
    EmailAnalyticsRecord, EmailQueueItem, NewSubscriber, Post, Project, QueueStatus, Subscriber,
    SubscriberStatus,
};

use super::{
    AnalyticsRepo, ContentRepo, EventStamp, NewAnalyticsRecord, QueueRepo, RepoError, RepoResult,
    SubscriberRepo,
};

/// In-memory subscriber repository
#[derive(Debug, Default)]
pub struct MemorySubscriberRepo {
    rows: RwLock<Vec<Subscriber>>,
}

impl MemorySubscriberRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, subscriber: Subscriber) {
        self.rows.write().await.push(subscriber);
    }

    pub async fn get(&self, id: Uuid) -> Option<Subscriber> {
        self.rows.read().await.iter().find(|s| s.id == id).cloned()
    }

    pub async fn get_by_email(&self, email: &str) -> Option<Subscriber> {
        self.rows
            .read()
            .await
            .iter()
            .find(|s| s.email == email)
            .cloned()
    }
}

#[async_trait::async_trait]
impl SubscriberRepo for MemorySubscriberRepo {
    async fn insert(&self, new_subscriber: &NewSubscriber) -> RepoResult<Uuid> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|s| s.email == new_subscriber.email.as_ref()) {
            return Err(RepoError::Duplicate(new_subscriber.email.to_string()));
        }

        let now = Utc::now();
        let subscriber = Subscriber {
            id: Uuid::new_v4(),
            email: new_subscriber.email.to_string(),
            status: SubscriberStatus::Active,
            unsubscribe_token: new_subscriber.unsubscribe_token.clone(),
            created_at: now,
            updated_at: now,
        };
        let id = subscriber.id;
        rows.push(subscriber);
        Ok(id)
    }

    async fn fetch_active(&self) -> RepoResult<Vec<Subscriber>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|s| s.status == SubscriberStatus::Active)
            .cloned()
            .collect())
    }

    async fn find_by_token(&self, token: &str) -> RepoResult<Option<Subscriber>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|s| s.unsubscribe_token == token)
            .cloned())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: SubscriberStatus,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        if let Some(subscriber) = rows.iter_mut().find(|s| s.id == id) {
            subscriber.status = status;
            subscriber.updated_at = updated_at;
        }
        Ok(())
    }

    async fn set_status_by_email(
        &self,
        email: &str,
        status: SubscriberStatus,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        if let Some(subscriber) = rows.iter_mut().find(|s| s.email == email) {
            subscriber.status = status;
            subscriber.updated_at = updated_at;
        }
        Ok(())
    }
}

/// In-memory email queue repository
#[derive(Debug, Default)]
pub struct MemoryQueueRepo {
    rows: RwLock<Vec<EmailQueueItem>>,
}

impl MemoryQueueRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, item: EmailQueueItem) {
        self.rows.write().await.push(item);
    }

    pub async fn get(&self, id: Uuid) -> Option<EmailQueueItem> {
        self.rows.read().await.iter().find(|i| i.id == id).cloned()
    }
}

#[async_trait::async_trait]
impl QueueRepo for MemoryQueueRepo {
    async fn fetch_eligible(
        &self,
        max_retries: i32,
        limit: i64,
    ) -> RepoResult<Vec<EmailQueueItem>> {
        let mut items: Vec<EmailQueueItem> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|i| i.status == QueueStatus::Pending && i.retry_count < max_retries)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.scheduled_at);
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn fetch_by_ids(&self, ids: &[Uuid]) -> RepoResult<Vec<EmailQueueItem>> {
        let mut items: Vec<EmailQueueItem> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect();
        items.sort_by_key(|i| i.scheduled_at);
        Ok(items)
    }

    async fn mark_processing(&self, id: Uuid) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        if let Some(item) = rows.iter_mut().find(|i| i.id == id) {
            item.status = QueueStatus::Processing;
        }
        Ok(())
    }

    async fn mark_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        if let Some(item) = rows.iter_mut().find(|i| i.id == id) {
            item.status = QueueStatus::Sent;
            item.sent_at = Some(sent_at);
            item.error_message = None;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        if let Some(item) = rows.iter_mut().find(|i| i.id == id) {
            item.status = QueueStatus::Failed;
            item.retry_count += 1;
            item.error_message = Some(error_message.to_string());
        }
        Ok(())
    }
}

/// In-memory content repository
#[derive(Debug, Default)]
pub struct MemoryContentRepo {
    posts: RwLock<Vec<Post>>,
    projects: RwLock<Vec<Project>>,
}

impl MemoryContentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_post(&self, post: Post) {
        self.posts.write().await.push(post);
    }

    pub async fn seed_project(&self, project: Project) {
        self.projects.write().await.push(project);
    }
}

#[async_trait::async_trait]
impl ContentRepo for MemoryContentRepo {
    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        Ok(self.posts.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn find_project(&self, id: Uuid) -> RepoResult<Option<Project>> {
        Ok(self
            .projects
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn latest_post(&self) -> RepoResult<Option<Post>> {
        Ok(self
            .posts
            .read()
            .await
            .iter()
            .max_by_key(|p| p.published_at)
            .cloned())
    }

    async fn latest_project(&self) -> RepoResult<Option<Project>> {
        Ok(self
            .projects
            .read()
            .await
            .iter()
            .max_by_key(|p| p.created_at)
            .cloned())
    }
}

/// In-memory analytics repository
#[derive(Debug, Default)]
pub struct MemoryAnalyticsRepo {
    rows: RwLock<Vec<EmailAnalyticsRecord>>,
}

impl MemoryAnalyticsRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, record: EmailAnalyticsRecord) {
        self.rows.write().await.push(record);
    }

    pub async fn get(&self, id: Uuid) -> Option<EmailAnalyticsRecord> {
        self.rows.read().await.iter().find(|r| r.id == id).cloned()
    }

    pub async fn all(&self) -> Vec<EmailAnalyticsRecord> {
        self.rows.read().await.clone()
    }
}

#[async_trait::async_trait]
impl AnalyticsRepo for MemoryAnalyticsRepo {
    async fn insert(&self, record: &NewAnalyticsRecord) -> RepoResult<Uuid> {
        let stored = EmailAnalyticsRecord {
            id: Uuid::new_v4(),
            email_queue_id: record.email_queue_id,
            subscriber_email: record.subscriber_email.clone(),
            sent_at: record.sent_at,
            delivered_at: None,
            opened_at: None,
            clicked_at: None,
            bounced_at: None,
            unsubscribed_at: None,
            created_at: Utc::now(),
        };
        let id = stored.id;
        self.rows.write().await.push(stored);
        Ok(id)
    }

    async fn latest_undelivered_for_email(
        &self,
        email: &str,
    ) -> RepoResult<Option<EmailAnalyticsRecord>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.subscriber_email == email && r.delivered_at.is_none())
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn latest_for_email(&self, email: &str) -> RepoResult<Option<EmailAnalyticsRecord>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.subscriber_email == email)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn latest_since_for_email(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> RepoResult<Option<EmailAnalyticsRecord>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.subscriber_email == email && r.created_at >= since)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn stamp(&self, id: Uuid, stamp: EventStamp, at: DateTime<Utc>) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        if let Some(record) = rows.iter_mut().find(|r| r.id == id) {
            match stamp {
                EventStamp::Delivered => record.delivered_at = Some(at),
                EventStamp::Opened => record.opened_at = Some(at),
                EventStamp::Clicked => record.clicked_at = Some(at),
                EventStamp::Bounced => record.bounced_at = Some(at),
                EventStamp::Unsubscribed => record.unsubscribed_at = Some(at),
            }
        }
        Ok(())
    }
}
