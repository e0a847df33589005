mod analytics;
mod content;
mod queue;
mod subscriber;

pub use analytics::EmailAnalyticsRecord;
pub use content::{ContentType, Post, Project};
pub use queue::{EmailQueueItem, QueueStatus};
pub use subscriber::{NewSubscriber, Subscriber, SubscriberStatus};
