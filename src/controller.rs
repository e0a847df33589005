/// Queue processing and template preview endpoints
pub mod queue;
/// Newsletter signup endpoint
pub mod subscriptions;
/// Self-service unsubscribe pages
pub mod unsubscribe;
/// Delivery-event webhook intake
pub mod webhooks;
