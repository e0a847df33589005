use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use reqwest::{Client, Method, Response};

use secrecy::Secret;

use serde_json::json;

use url::Url;

use uuid::Uuid;

use wiremock::MockServer;

use mailworks::app::{self, AppState};
use mailworks::client::EmailClient;
use mailworks::crypto::WebhookVerifier;
use mailworks::model::{
    ContentType, EmailAnalyticsRecord, EmailQueueItem, Post, Project, QueueStatus, Subscriber,
    SubscriberStatus,
};
use mailworks::repo::memory::{
    MemoryAnalyticsRepo, MemoryContentRepo, MemoryQueueRepo, MemorySubscriberRepo,
};
use mailworks::repo::{AnalyticsRepo, ContentRepo, QueueRepo, SubscriberRepo};

pub const SITE_BASE_URL: &str = "https://example.com";

pub struct TestApp {
    addr: String,

    pub client: Client,
    pub email_server: MockServer,
    pub subscribers: Arc<MemorySubscriberRepo>,
    pub queue: Arc<MemoryQueueRepo>,
    pub content: Arc<MemoryContentRepo>,
    pub analytics: Arc<MemoryAnalyticsRepo>,

    verifier: WebhookVerifier,
}

impl TestApp {
    pub async fn spawn() -> Self {
        use rand::{distributions::Alphanumeric, Rng};

        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let email_server = MockServer::start().await;

        let email_client = {
            let sender = "newsletter@test.com"
                .parse()
                .expect("Failed to parse sender email address");
            let api_base_url =
                Url::parse(&email_server.uri()).expect("Failed to parse mock server uri");
            let api_auth_token = Secret::new("TestAuthorization".into());
            let api_timeout = Duration::from_secs(2);

            EmailClient::new(sender, api_timeout, api_base_url, api_auth_token)
                .expect("Failed to create email client")
        };

        let verifier = {
            let rand_secret: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(24)
                .map(char::from)
                .collect();

            WebhookVerifier::new(&Secret::new(rand_secret))
        };

        let subscribers = Arc::new(MemorySubscriberRepo::new());
        let queue = Arc::new(MemoryQueueRepo::new());
        let content = Arc::new(MemoryContentRepo::new());
        let analytics = Arc::new(MemoryAnalyticsRepo::new());

        let state = AppState::new(
            Arc::clone(&subscribers) as Arc<dyn SubscriberRepo>,
            Arc::clone(&queue) as Arc<dyn QueueRepo>,
            Arc::clone(&content) as Arc<dyn ContentRepo>,
            Arc::clone(&analytics) as Arc<dyn AnalyticsRepo>,
            Arc::new(email_client),
            verifier.clone(),
            Url::parse(SITE_BASE_URL).expect("Failed to parse site base URL"),
        );

        let server = app::run(listener, state).expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        let client = Client::new();

        Self {
            addr,
            client,
            email_server,
            subscribers,
            queue,
            content,
            analytics,
            verifier,
        }
    }

    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", &self.addr, url);
        self.client.request(method, url)
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.request(Method::GET, "health_check").send().await
    }

    pub async fn subscription_create(&self, email: Option<&str>) -> Response {
        let mut form = Vec::new();
        if let Some(email) = email {
            form.push(("email", email));
        }

        self.request(Method::POST, "subscriptions")
            .form(&form)
            .send()
            .await
            .expect("Failed to execute subscription request")
    }

    pub async fn queue_process(&self, queue_ids: Option<Vec<Uuid>>) -> Response {
        let request = self.request(Method::POST, "queue/process");
        let request = match queue_ids {
            Some(ids) => request.json(&json!({ "queueIds": ids })),
            None => request,
        };

        request
            .send()
            .await
            .expect("Failed to execute queue process request")
    }

    pub async fn queue_preview(&self, body: &serde_json::Value) -> Response {
        self.request(Method::POST, "queue/preview")
            .json(body)
            .send()
            .await
            .expect("Failed to execute queue preview request")
    }

    /// Post a delivery event with a valid signature over the exact body
    pub async fn webhook_event(&self, event: &serde_json::Value) -> Response {
        let body = serde_json::to_vec(event).expect("Failed to serialize event");
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self
            .verifier
            .sign_header(&timestamp, &body)
            .expect("Failed to sign webhook body");

        self.webhook_raw(&signature, &timestamp, body).await
    }

    /// Post a delivery event with caller-supplied signature material
    pub async fn webhook_raw(
        &self,
        signature: &str,
        timestamp: &str,
        body: Vec<u8>,
    ) -> Response {
        self.request(Method::POST, "webhooks/email")
            .header("svix-signature", signature)
            .header("svix-timestamp", timestamp)
            .header("svix-id", "msg_test")
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute webhook request")
    }

    pub fn sign(&self, timestamp: &str, body: &[u8]) -> String {
        self.verifier
            .sign_header(timestamp, body)
            .expect("Failed to sign body")
    }

    pub async fn unsubscribe(&self, token: Option<&str>) -> Response {
        let url = match token {
            Some(token) => format!("unsubscribe?token={}", token),
            None => "unsubscribe".into(),
        };

        self.request(Method::GET, &url)
            .send()
            .await
            .expect("Failed to execute unsubscribe request")
    }

    pub async fn seed_subscriber(&self, email: &str, status: SubscriberStatus) -> Subscriber {
        let now = Utc::now();
        let subscriber = Subscriber {
            id: Uuid::new_v4(),
            email: email.to_string(),
            status,
            unsubscribe_token: Uuid::new_v4().simple().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.subscribers.seed(subscriber.clone()).await;
        subscriber
    }

    pub async fn seed_post(&self, title: &str) -> Post {
        let post = Post {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            excerpt: Some(format!("All about {}", title)),
            tags: vec!["rust".into()],
            image_url: None,
            published_at: Utc::now(),
        };
        self.content.seed_post(post.clone()).await;
        post
    }

    pub async fn seed_project(&self, title: &str) -> Project {
        let project = Project {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: format!("{} description", title),
            tags: Vec::new(),
            image_url: None,
            repo_url: None,
            created_at: Utc::now(),
        };
        self.content.seed_project(project.clone()).await;
        project
    }

    pub async fn seed_queue_item(
        &self,
        content_type: ContentType,
        content_id: Uuid,
    ) -> EmailQueueItem {
        let item = EmailQueueItem {
            id: Uuid::new_v4(),
            content_type,
            content_id,
            status: QueueStatus::Pending,
            scheduled_at: Utc::now(),
            sent_at: None,
            error_message: None,
            retry_count: 0,
            created_at: Utc::now(),
        };
        self.queue.seed(item.clone()).await;
        item
    }

    pub async fn seed_analytics(&self, email: &str, queue_id: Uuid) -> EmailAnalyticsRecord {
        let now = Utc::now();
        let record = EmailAnalyticsRecord {
            id: Uuid::new_v4(),
            email_queue_id: queue_id,
            subscriber_email: email.to_string(),
            sent_at: now,
            delivered_at: None,
            opened_at: None,
            clicked_at: None,
            bounced_at: None,
            unsubscribed_at: None,
            created_at: now,
        };
        self.analytics.seed(record.clone()).await;
        record
    }
}

/// Matches outgoing email requests addressed to a specific recipient.
pub struct RecipientMatcher(String);

pub fn recipient_matcher(email: &str) -> RecipientMatcher {
    RecipientMatcher(email.to_string())
}

impl wiremock::Match for RecipientMatcher {
    fn matches(&self, request: &wiremock::Request) -> bool {
        serde_json::from_slice::<serde_json::Value>(&request.body)
            .map(|body| body["to"][0] == self.0.as_str())
            .unwrap_or(false)
    }
}
