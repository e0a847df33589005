use std::sync::Arc;

use chrono::Utc;

use serde::Serialize;

use tokio::task::JoinSet;

use url::Url;

use uuid::Uuid;

use crate::client::{EmailClient, OutboundEmail};
use crate::model::{ContentType, EmailQueueItem, Subscriber};
use crate::repo::{
    AnalyticsRepo, ContentRepo, NewAnalyticsRecord, QueueRepo, RepoError, RepoResult,
    SubscriberRepo,
};
use crate::template::{
    render_blog_post_email, render_project_email, BlogPostEmail, ProjectEmail,
};

/// Upper bound on queue items handled per invocation
const BATCH_SIZE: i64 = 50;
/// An item is retried at most this many times before the selection
/// filter stops picking it up
const MAX_RETRIES: i32 = 3;

const ALL_SENDS_FAILED: &str = "All email sends failed";

#[derive(Debug, thiserror::Error)]
enum ItemError {
    #[error("Content {content_type} {content_id} not found")]
    MissingContent {
        content_type: ContentType,
        content_id: Uuid,
    },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Outcome of one queue item within a processing run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    pub queue_item_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_subscribers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemReport {
    fn failure(queue_item_id: Uuid, error: String) -> Self {
        Self {
            queue_item_id,
            content_type: None,
            content_title: None,
            success_count: None,
            total_subscribers: None,
            error: Some(error),
        }
    }
}

/// Aggregate outcome of one `process` invocation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessReport {
    pub message: String,
    pub results: Vec<ItemReport>,
    pub processed_items: usize,
    pub total_subscribers: usize,
}

impl ProcessReport {
    fn empty(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            results: Vec::new(),
            processed_items: 0,
            total_subscribers: 0,
        }
    }
}

/// Drains pending queue items and fans each one out to every active
/// subscriber. Items are handled one at a time; the per-subscriber sends
/// within an item all run concurrently.
///
/// There is no claim step against concurrent invocations: two overlapping
/// runs could pick up the same pending item. Invocations are operator or
/// cron triggered and batches are small, so the race is accepted.
pub struct QueueProcessor {
    queue: Arc<dyn QueueRepo>,
    subscribers: Arc<dyn SubscriberRepo>,
    content: Arc<dyn ContentRepo>,
    analytics: Arc<dyn AnalyticsRepo>,
    email_client: Arc<EmailClient>,
    site_base_url: Url,
}

impl QueueProcessor {
    pub fn new(
        queue: Arc<dyn QueueRepo>,
        subscribers: Arc<dyn SubscriberRepo>,
        content: Arc<dyn ContentRepo>,
        analytics: Arc<dyn AnalyticsRepo>,
        email_client: Arc<EmailClient>,
        site_base_url: Url,
    ) -> Self {
        Self {
            queue,
            subscribers,
            content,
            analytics,
            email_client,
            site_base_url,
        }
    }

    /// Process eligible pending items, or the explicitly named ones.
    /// Explicit ids bypass the status/retry filter to support manual
    /// "retry" and "send now" actions.
    ///
    /// Item-level failures are isolated: they mark that item failed and
    /// processing moves on. Only store-level fetch errors surface to the
    /// caller, who is expected to retry the whole invocation.
    #[tracing::instrument(name = "Process email queue", skip(self))]
    pub async fn process(&self, queue_ids: Option<Vec<Uuid>>) -> RepoResult<ProcessReport> {
        let items = match queue_ids {
            Some(ids) if !ids.is_empty() => self.queue.fetch_by_ids(&ids).await?,
            _ => self.queue.fetch_eligible(MAX_RETRIES, BATCH_SIZE).await?,
        };

        if items.is_empty() {
            return Ok(ProcessReport::empty("No pending emails in queue"));
        }

        let subscribers = self.subscribers.fetch_active().await?;
        if subscribers.is_empty() {
            // Nothing to do, not an error: items stay pending
            return Ok(ProcessReport::empty("No active subscribers to send to"));
        }

        let mut results = Vec::with_capacity(items.len());
        for item in &items {
            let report = match self.process_item(item, &subscribers).await {
                Ok(report) => report,
                Err(error) => {
                    tracing::error!(
                        queue_item_id = %item.id,
                        error = %error,
                        "Queue item processing failed"
                    );
                    if let Err(update_error) =
                        self.queue.mark_failed(item.id, &error.to_string()).await
                    {
                        tracing::error!(
                            queue_item_id = %item.id,
                            error = %update_error,
                            "Failed to record queue item failure"
                        );
                    }
                    ItemReport::failure(item.id, error.to_string())
                }
            };
            results.push(report);
        }

        Ok(ProcessReport {
            message: format!("Processed {} queue item(s)", results.len()),
            processed_items: results.len(),
            total_subscribers: subscribers.len(),
            results,
        })
    }

    async fn process_item(
        &self,
        item: &EmailQueueItem,
        subscribers: &[Subscriber],
    ) -> Result<ItemReport, ItemError> {
        self.queue.mark_processing(item.id).await?;

        let (content_title, emails) = self.render_batch(item, subscribers).await?;

        let mut sends = JoinSet::new();
        for email in emails {
            let client = Arc::clone(&self.email_client);
            sends.spawn(async move {
                let recipient = email.recipient.to_string();
                let outcome = client.send(&email).await;
                (recipient, outcome)
            });
        }

        // Failures are collected individually; one bad send never cancels
        // its siblings
        let mut success_count = 0usize;
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((recipient, Ok(()))) => {
                    success_count += 1;
                    let record = NewAnalyticsRecord {
                        email_queue_id: item.id,
                        subscriber_email: recipient,
                        sent_at: Utc::now(),
                    };
                    if let Err(error) = self.analytics.insert(&record).await {
                        tracing::error!(
                            queue_item_id = %item.id,
                            error = %error,
                            "Failed to insert analytics record"
                        );
                    }
                }
                Ok((recipient, Err(error))) => {
                    tracing::warn!(recipient = %recipient, error = %error, "Email send failed");
                }
                Err(join_error) => {
                    tracing::error!(error = %join_error, "Email send task panicked");
                }
            }
        }

        if success_count > 0 {
            self.queue.mark_sent(item.id, Utc::now()).await?;
        } else {
            self.queue.mark_failed(item.id, ALL_SENDS_FAILED).await?;
        }

        Ok(ItemReport {
            queue_item_id: item.id,
            content_type: Some(item.content_type),
            content_title: Some(content_title),
            success_count: Some(success_count),
            total_subscribers: Some(subscribers.len()),
            error: (success_count == 0).then(|| ALL_SENDS_FAILED.to_string()),
        })
    }

    /// Resolve the referenced content row and render one email per
    /// subscriber. Subscribers whose stored address no longer parses are
    /// skipped with a warning rather than failing the item.
    async fn render_batch(
        &self,
        item: &EmailQueueItem,
        subscribers: &[Subscriber],
    ) -> Result<(String, Vec<OutboundEmail>), ItemError> {
        let missing = || ItemError::MissingContent {
            content_type: item.content_type,
            content_id: item.content_id,
        };

        let mut emails = Vec::with_capacity(subscribers.len());

        let title = match item.content_type {
            ContentType::BlogPost => {
                let post = self
                    .content
                    .find_post(item.content_id)
                    .await?
                    .ok_or_else(missing)?;

                for subscriber in subscribers {
                    let recipient = match subscriber.email.parse() {
                        Ok(recipient) => recipient,
                        Err(error) => {
                            tracing::warn!(
                                subscriber_id = %subscriber.id,
                                email = %subscriber.email,
                                error = %error,
                                "Skipping subscriber with unparseable address"
                            );
                            continue;
                        }
                    };
                    let html_body = render_blog_post_email(&BlogPostEmail {
                        recipient: &subscriber.email,
                        unsubscribe_token: &subscriber.unsubscribe_token,
                        site_base_url: &self.site_base_url,
                        title: &post.title,
                        slug: &post.slug,
                        excerpt: post.excerpt.as_deref(),
                        tags: &post.tags,
                        image_url: post.image_url.as_deref(),
                        published_at: post.published_at,
                    });
                    emails.push(OutboundEmail {
                        recipient,
                        subject: format!("New post: {}", post.title),
                        html_body,
                    });
                }
                post.title
            }
            ContentType::Project => {
                let project = self
                    .content
                    .find_project(item.content_id)
                    .await?
                    .ok_or_else(missing)?;

                for subscriber in subscribers {
                    let recipient = match subscriber.email.parse() {
                        Ok(recipient) => recipient,
                        Err(error) => {
                            tracing::warn!(
                                subscriber_id = %subscriber.id,
                                email = %subscriber.email,
                                error = %error,
                                "Skipping subscriber with unparseable address"
                            );
                            continue;
                        }
                    };
                    let html_body = render_project_email(&ProjectEmail {
                        recipient: &subscriber.email,
                        unsubscribe_token: &subscriber.unsubscribe_token,
                        site_base_url: &self.site_base_url,
                        title: &project.title,
                        project_id: project.id,
                        description: &project.description,
                        tags: &project.tags,
                        image_url: project.image_url.as_deref(),
                        repo_url: project.repo_url.as_deref(),
                    });
                    emails.push(OutboundEmail {
                        recipient,
                        subject: format!("New project: {}", project.title),
                        html_body,
                    });
                }
                project.title
            }
        };

        Ok((title, emails))
    }
}
