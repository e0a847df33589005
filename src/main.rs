use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use sqlx::PgPool;

use mailworks::app::{self, AppState};
use mailworks::client::EmailClient;
use mailworks::crypto::WebhookVerifier;
use mailworks::repo::{PgAnalyticsRepo, PgContentRepo, PgQueueRepo, PgSubscriberRepo};
use mailworks::settings::Settings;
use mailworks::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("info")?;

    let settings = Settings::load().context("Failed to load settings")?;

    let pool = PgPool::connect_with(settings.database.with_db()).await?;

    let email_client = EmailClient::new(
        settings.email.sender(),
        settings.email.api_timeout(),
        settings.email.api_base_url(),
        settings.email.api_auth_token(),
    )?;

    let state = AppState::new(
        Arc::new(PgSubscriberRepo::new(pool.clone())),
        Arc::new(PgQueueRepo::new(pool.clone())),
        Arc::new(PgContentRepo::new(pool.clone())),
        Arc::new(PgAnalyticsRepo::new(pool)),
        Arc::new(email_client),
        WebhookVerifier::new(settings.email.webhook_secret()),
        settings.app.site_base_url(),
    );

    let listener = TcpListener::bind(settings.app.addr())?;

    app::run(listener, state)?.await.context("Failed to run app")
}
