use reqwest::StatusCode;

use serde_json::json;

use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

use mailworks::model::{ContentType, QueueStatus, SubscriberStatus};
use mailworks::repo::QueueRepo;

use crate::helpers::TestApp;

async fn mount_email_ok(app: &TestApp, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200))
        .expect(expected)
        .mount(&app.email_server)
        .await;
}

#[tokio::test]
async fn pending_blog_post_is_sent_to_active_subscriber() {
    let app = TestApp::spawn().await;

    let subscriber = app
        .seed_subscriber("a@example.com", SubscriberStatus::Active)
        .await;
    let post = app.seed_post("Hello World").await;
    let item = app.seed_queue_item(ContentType::BlogPost, post.id).await;

    mount_email_ok(&app, 1).await;

    let res = app.queue_process(None).await;
    assert_eq!(StatusCode::OK, res.status());

    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(1, report["processedItems"]);
    assert_eq!(1, report["results"][0]["successCount"]);
    assert_eq!("Hello World", report["results"][0]["contentTitle"]);

    // Queue item reached its terminal state
    let stored = app.queue.get(item.id).await.unwrap();
    assert_eq!(QueueStatus::Sent, stored.status);
    assert!(stored.sent_at.is_some());

    // Exactly one analytics record with sent_at set
    let records = app.analytics.all().await;
    assert_eq!(1, records.len());
    assert_eq!("a@example.com", records[0].subscriber_email);

    // The rendered HTML carries the title and the token-bearing link
    let requests = app.email_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let html = body["html"].as_str().unwrap();
    assert!(html.contains("Hello World"));
    assert!(html.contains(&format!("token={}", subscriber.unsubscribe_token)));
    assert_eq!("a@example.com", body["to"][0]);
}

#[tokio::test]
async fn zero_successful_sends_marks_item_failed() {
    let app = TestApp::spawn().await;

    app.seed_subscriber("a@example.com", SubscriberStatus::Active)
        .await;
    let post = app.seed_post("Hello World").await;
    let item = app.seed_queue_item(ContentType::BlogPost, post.id).await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.email_server)
        .await;

    let res = app.queue_process(None).await;
    assert_eq!(StatusCode::OK, res.status());

    let stored = app.queue.get(item.id).await.unwrap();
    assert_eq!(QueueStatus::Failed, stored.status);
    assert_eq!(1, stored.retry_count);
    assert_eq!(Some("All email sends failed".into()), stored.error_message);

    assert!(app.analytics.all().await.is_empty());
}

#[tokio::test]
async fn partial_success_still_counts_as_sent() {
    let app = TestApp::spawn().await;

    app.seed_subscriber("ok@example.com", SubscriberStatus::Active)
        .await;
    app.seed_subscriber("broken@example.com", SubscriberStatus::Active)
        .await;
    let post = app.seed_post("Hello World").await;
    let item = app.seed_queue_item(ContentType::BlogPost, post.id).await;

    // First recipient accepted, second rejected
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(crate::helpers::recipient_matcher("ok@example.com"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.email_server)
        .await;

    let res = app.queue_process(None).await;
    assert_eq!(StatusCode::OK, res.status());

    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(1, report["results"][0]["successCount"]);
    assert_eq!(2, report["results"][0]["totalSubscribers"]);

    let stored = app.queue.get(item.id).await.unwrap();
    assert_eq!(QueueStatus::Sent, stored.status);
    assert_eq!(0, stored.retry_count);

    let records = app.analytics.all().await;
    assert_eq!(1, records.len());
    assert_eq!("ok@example.com", records[0].subscriber_email);
}

#[tokio::test]
async fn inactive_subscribers_receive_nothing() {
    let app = TestApp::spawn().await;

    app.seed_subscriber("active@example.com", SubscriberStatus::Active)
        .await;
    app.seed_subscriber("inactive@example.com", SubscriberStatus::Inactive)
        .await;
    app.seed_subscriber("gone@example.com", SubscriberStatus::Unsubscribed)
        .await;
    let post = app.seed_post("Hello World").await;
    app.seed_queue_item(ContentType::BlogPost, post.id).await;

    mount_email_ok(&app, 1).await;

    let res = app.queue_process(None).await;
    assert_eq!(StatusCode::OK, res.status());

    let requests = app.email_server.received_requests().await.unwrap();
    assert_eq!(1, requests.len());
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!("active@example.com", body["to"][0]);
}

#[tokio::test]
async fn no_active_subscribers_leaves_items_pending() {
    let app = TestApp::spawn().await;

    let post = app.seed_post("Hello World").await;
    let item = app.seed_queue_item(ContentType::BlogPost, post.id).await;

    mount_email_ok(&app, 0).await;

    let res = app.queue_process(None).await;
    assert_eq!(StatusCode::OK, res.status());

    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(0, report["processedItems"]);

    // "Nothing to do" is not a failure
    let stored = app.queue.get(item.id).await.unwrap();
    assert_eq!(QueueStatus::Pending, stored.status);
    assert_eq!(0, stored.retry_count);
}

#[tokio::test]
async fn missing_content_fails_the_item_and_continues() {
    let app = TestApp::spawn().await;

    app.seed_subscriber("a@example.com", SubscriberStatus::Active)
        .await;
    let orphan = app
        .seed_queue_item(ContentType::BlogPost, uuid::Uuid::new_v4())
        .await;
    let post = app.seed_post("Hello World").await;
    let healthy = app.seed_queue_item(ContentType::BlogPost, post.id).await;

    mount_email_ok(&app, 1).await;

    let res = app.queue_process(None).await;
    assert_eq!(StatusCode::OK, res.status());

    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(2, report["processedItems"]);

    let failed = app.queue.get(orphan.id).await.unwrap();
    assert_eq!(QueueStatus::Failed, failed.status);
    assert_eq!(1, failed.retry_count);
    assert!(failed.error_message.unwrap().contains("not found"));

    // The bad item does not block its sibling
    let sent = app.queue.get(healthy.id).await.unwrap();
    assert_eq!(QueueStatus::Sent, sent.status);
}

#[tokio::test]
async fn exhausted_items_are_skipped_unless_explicitly_requested() {
    let app = TestApp::spawn().await;

    app.seed_subscriber("a@example.com", SubscriberStatus::Active)
        .await;
    let post = app.seed_post("Hello World").await;
    let item = app.seed_queue_item(ContentType::BlogPost, post.id).await;
    let exhausted = item.id;

    // Burn through every retry
    for _ in 0..3 {
        app.queue.mark_failed(exhausted, "boom").await.unwrap();
    }

    mount_email_ok(&app, 1).await;

    // Default selection skips it entirely
    let res = app.queue_process(None).await;
    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(0, report["processedItems"]);

    // An explicit id bypasses the filter ("send now")
    let res = app.queue_process(Some(vec![exhausted])).await;
    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(1, report["processedItems"]);

    let stored = app.queue.get(exhausted).await.unwrap();
    assert_eq!(QueueStatus::Sent, stored.status);
}

#[tokio::test]
async fn project_items_render_the_project_template() {
    let app = TestApp::spawn().await;

    app.seed_subscriber("a@example.com", SubscriberStatus::Active)
        .await;
    let project = app.seed_project("Side Project").await;
    let item = app.seed_queue_item(ContentType::Project, project.id).await;

    mount_email_ok(&app, 1).await;

    let res = app.queue_process(None).await;
    assert_eq!(StatusCode::OK, res.status());

    let stored = app.queue.get(item.id).await.unwrap();
    assert_eq!(QueueStatus::Sent, stored.status);

    let requests = app.email_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!("New project: Side Project", body["subject"]);
    assert!(body["html"]
        .as_str()
        .unwrap()
        .contains(&format!("/projects/{}", project.id)));
}

#[tokio::test]
async fn preview_renders_latest_post_without_sending() {
    let app = TestApp::spawn().await;

    app.seed_post("Hello World").await;
    mount_email_ok(&app, 0).await;

    let res = app
        .queue_preview(&json!({ "contentType": "blog_post", "mode": "latest" }))
        .await;
    assert_eq!(StatusCode::OK, res.status());

    let preview: serde_json::Value = res.json().await.unwrap();
    assert_eq!("Hello World", preview["title"]);
    assert!(preview["html"].as_str().unwrap().contains("Hello World"));
}

#[tokio::test]
async fn preview_unknown_content_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .queue_preview(&json!({
            "contentType": "project",
            "contentId": uuid::Uuid::new_v4(),
        }))
        .await;

    assert_eq!(StatusCode::NOT_FOUND, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn preview_requires_id_or_latest_mode() {
    let app = TestApp::spawn().await;

    let res = app.queue_preview(&json!({ "contentType": "blog_post" })).await;

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}
