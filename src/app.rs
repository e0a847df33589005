use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use tracing_actix_web::TracingLogger;

use url::Url;

use crate::client::EmailClient;
use crate::controller::{queue, subscriptions, unsubscribe, webhooks};
use crate::crypto::WebhookVerifier;
use crate::processor::QueueProcessor;
use crate::repo::{AnalyticsRepo, ContentRepo, QueueRepo, SubscriberRepo};

/// Shared handler dependencies, behind repository traits so tests can
/// swap in in-memory stores
pub struct AppState {
    pub processor: QueueProcessor,
    pub subscribers: Arc<dyn SubscriberRepo>,
    pub content: Arc<dyn ContentRepo>,
    pub analytics: Arc<dyn AnalyticsRepo>,
    pub webhook_verifier: WebhookVerifier,
    pub site_base_url: Url,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subscribers: Arc<dyn SubscriberRepo>,
        queue: Arc<dyn QueueRepo>,
        content: Arc<dyn ContentRepo>,
        analytics: Arc<dyn AnalyticsRepo>,
        email_client: Arc<EmailClient>,
        webhook_verifier: WebhookVerifier,
        site_base_url: Url,
    ) -> Self {
        let processor = QueueProcessor::new(
            queue,
            Arc::clone(&subscribers),
            Arc::clone(&content),
            Arc::clone(&analytics),
            email_client,
            site_base_url.clone(),
        );

        Self {
            processor,
            subscribers,
            content,
            analytics,
            webhook_verifier,
            site_base_url,
        }
    }
}

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Run the application on a specified TCP listener
pub fn run(listener: TcpListener, state: AppState) -> anyhow::Result<Server> {
    // Wrap application data
    let state = web::Data::new(state);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .service(health_check)
            .service(subscriptions::scope())
            .service(queue::scope())
            .service(webhooks::scope())
            .service(unsubscribe::unsubscribe)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
