use reqwest::StatusCode;

use mailworks::model::SubscriberStatus;

use crate::helpers::TestApp;

#[tokio::test]
async fn subscribe_returns_created_for_valid_email() {
    let app = TestApp::spawn().await;

    let res = app.subscription_create(Some("reader@example.com")).await;

    assert_eq!(StatusCode::CREATED, res.status());

    let subscriber = app
        .subscribers
        .get_by_email("reader@example.com")
        .await
        .expect("Subscriber was not stored");
    assert_eq!(SubscriberStatus::Active, subscriber.status);
    assert!(!subscriber.unsubscribe_token.is_empty());
}

#[tokio::test]
async fn repeated_subscribe_is_acknowledged_not_duplicated() {
    let app = TestApp::spawn().await;

    let first = app.subscription_create(Some("reader@example.com")).await;
    assert_eq!(StatusCode::CREATED, first.status());

    let token_before = app
        .subscribers
        .get_by_email("reader@example.com")
        .await
        .unwrap()
        .unsubscribe_token;

    let second = app.subscription_create(Some("reader@example.com")).await;
    assert_eq!(StatusCode::OK, second.status());

    // The existing record, token included, is untouched
    let token_after = app
        .subscribers
        .get_by_email("reader@example.com")
        .await
        .unwrap()
        .unsubscribe_token;
    assert_eq!(token_before, token_after);
}

#[tokio::test]
async fn subscribe_rejects_invalid_email() {
    let app = TestApp::spawn().await;

    let res = app.subscription_create(Some("not-an-email")).await;

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}

#[tokio::test]
async fn subscribe_rejects_missing_email() {
    let app = TestApp::spawn().await;

    let res = app.subscription_create(None).await;

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}
