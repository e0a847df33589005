use reqwest::StatusCode;

use uuid::Uuid;

use mailworks::model::SubscriberStatus;

use crate::helpers::TestApp;

#[tokio::test]
async fn valid_token_unsubscribes_and_confirms_with_html() {
    let app = TestApp::spawn().await;

    let subscriber = app
        .seed_subscriber("a@example.com", SubscriberStatus::Active)
        .await;
    let record = app.seed_analytics("a@example.com", Uuid::new_v4()).await;

    let res = app.unsubscribe(Some(&subscriber.unsubscribe_token)).await;

    assert_eq!(StatusCode::OK, res.status());
    let content_type = res.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let body = res.text().await.unwrap();
    assert!(body.contains("unsubscribed"));

    let stored = app.subscribers.get(subscriber.id).await.unwrap();
    assert_eq!(SubscriberStatus::Unsubscribed, stored.status);
    assert!(stored.updated_at > subscriber.updated_at);

    // Attribution lands on the recent analytics record
    let stored = app.analytics.get(record.id).await.unwrap();
    assert!(stored.unsubscribed_at.is_some());
}

#[tokio::test]
async fn unsubscribe_works_without_any_analytics_history() {
    let app = TestApp::spawn().await;

    let subscriber = app
        .seed_subscriber("a@example.com", SubscriberStatus::Active)
        .await;

    let res = app.unsubscribe(Some(&subscriber.unsubscribe_token)).await;

    assert_eq!(StatusCode::OK, res.status());
    let stored = app.subscribers.get(subscriber.id).await.unwrap();
    assert_eq!(SubscriberStatus::Unsubscribed, stored.status);
}

#[tokio::test]
async fn repeated_unsubscribe_is_idempotent() {
    let app = TestApp::spawn().await;

    let subscriber = app
        .seed_subscriber("a@example.com", SubscriberStatus::Active)
        .await;

    let first = app.unsubscribe(Some(&subscriber.unsubscribe_token)).await;
    assert_eq!(StatusCode::OK, first.status());
    let after_first = app.subscribers.get(subscriber.id).await.unwrap();

    let second = app.unsubscribe(Some(&subscriber.unsubscribe_token)).await;
    assert_eq!(StatusCode::OK, second.status());

    // No second mutation
    let after_second = app.subscribers.get(subscriber.id).await.unwrap();
    assert_eq!(after_first.updated_at, after_second.updated_at);
    assert_eq!(SubscriberStatus::Unsubscribed, after_second.status);
}

#[tokio::test]
async fn missing_token_is_a_bad_request_page() {
    let app = TestApp::spawn().await;

    let res = app.unsubscribe(None).await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    let body = res.text().await.unwrap();
    assert!(body.contains("missing its token"));

    let res = app.unsubscribe(Some("")).await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}

#[tokio::test]
async fn unknown_token_is_a_not_found_page() {
    let app = TestApp::spawn().await;

    app.seed_subscriber("a@example.com", SubscriberStatus::Active)
        .await;

    let res = app.unsubscribe(Some("does-not-exist")).await;

    assert_eq!(StatusCode::NOT_FOUND, res.status());
    let body = res.text().await.unwrap();
    assert!(body.contains("no longer valid"));
}
