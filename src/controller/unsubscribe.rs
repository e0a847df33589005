use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{get, web, HttpResponse};

use chrono::{Duration, Utc};

use serde::Deserialize;

use crate::app::AppState;
use crate::model::SubscriberStatus;
use crate::repo::{EventStamp, RepoError};
use crate::template::{unsubscribe_confirmation_page, unsubscribe_error_page};

/// Window within which an unsubscribe is attributed back to the email
/// that most likely triggered it
const ATTRIBUTION_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct UnsubscribeQuery {
    token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum UnsubscribeError {
    #[error("Unknown unsubscribe token")]
    UnknownToken,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// One-click unsubscribe via the token embedded in every email.
/// Always answers with a full HTML page; repeating the request for an
/// already-unsubscribed token is a no-op that still confirms.
#[tracing::instrument(name = "Unsubscribe via token", skip(state, query))]
#[get("/unsubscribe")]
pub async fn unsubscribe(
    state: web::Data<AppState>,
    query: web::Query<UnsubscribeQuery>,
) -> HttpResponse {
    let Some(token) = query.token.as_deref().filter(|token| !token.is_empty()) else {
        return html_page(
            StatusCode::BAD_REQUEST,
            unsubscribe_error_page(
                "Invalid Request",
                "This unsubscribe link is missing its token.",
                &state.site_base_url,
            ),
        );
    };

    match apply_unsubscribe(&state, token).await {
        Ok(()) => html_page(
            StatusCode::OK,
            unsubscribe_confirmation_page(&state.site_base_url),
        ),
        Err(UnsubscribeError::UnknownToken) => html_page(
            StatusCode::NOT_FOUND,
            unsubscribe_error_page(
                "Link Not Found",
                "This unsubscribe link is no longer valid.",
                &state.site_base_url,
            ),
        ),
        Err(UnsubscribeError::Repo(error)) => {
            tracing::error!(error = %error, "Unsubscribe failed on store error");
            html_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                unsubscribe_error_page(
                    "Something Went Wrong",
                    "We could not process your request. Please try again later.",
                    &state.site_base_url,
                ),
            )
        }
    }
}

async fn apply_unsubscribe(state: &AppState, token: &str) -> Result<(), UnsubscribeError> {
    let subscriber = state
        .subscribers
        .find_by_token(token)
        .await?
        .ok_or(UnsubscribeError::UnknownToken)?;

    // Idempotent: nothing to mutate, still confirm
    if subscriber.status == SubscriberStatus::Unsubscribed {
        return Ok(());
    }

    let now = Utc::now();
    state
        .subscribers
        .set_status(subscriber.id, SubscriberStatus::Unsubscribed, now)
        .await?;

    // Best-effort attribution to the most recent email; failures here
    // must not undo the unsubscribe the visitor just confirmed
    let since = now - Duration::days(ATTRIBUTION_WINDOW_DAYS);
    match state
        .analytics
        .latest_since_for_email(&subscriber.email, since)
        .await
    {
        Ok(Some(record)) => {
            if let Err(error) = state
                .analytics
                .stamp(record.id, EventStamp::Unsubscribed, now)
                .await
            {
                tracing::warn!(error = %error, "Failed to attribute unsubscribe");
            }
        }
        Ok(None) => {}
        Err(error) => {
            tracing::warn!(error = %error, "Failed to look up unsubscribe attribution");
        }
    }

    Ok(())
}

fn html_page(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(body)
}
