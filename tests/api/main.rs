mod health_check;
mod helpers;
mod queue;
mod subscriptions;
mod unsubscribe;
