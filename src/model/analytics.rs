use chrono::{DateTime, Utc};

use serde::Serialize;

use uuid::Uuid;

/// One subscriber's delivery trace for one queue item.
/// Created right after a successful send; the delivery event timestamps
/// are filled in asynchronously by the webhook handler, last-write-wins.
#[derive(Debug, Clone, Serialize)]
pub struct EmailAnalyticsRecord {
    pub id: Uuid,
    pub email_queue_id: Uuid,
    pub subscriber_email: String,
    pub sent_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub bounced_at: Option<DateTime<Utc>>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
