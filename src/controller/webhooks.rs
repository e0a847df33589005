use actix_web::dev::HttpServiceFactory;
use actix_web::http::header::HeaderMap;
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};

use chrono::Utc;

use serde::Deserialize;

use crate::app::AppState;
use crate::error::{RestError, RestResult};
use crate::model::SubscriberStatus;
use crate::repo::EventStamp;

const SIGNATURE_HEADER: &str = "svix-signature";
const TIMESTAMP_HEADER: &str = "svix-timestamp";
const ID_HEADER: &str = "svix-id";

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
struct WebhookEventData {
    #[serde(default)]
    to: Vec<String>,
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> RestResult<&'h str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| RestError::ParseError(format!("Missing {} header", name)))
}

/// Receive an asynchronous delivery event and reconcile it against the
/// most recent matching analytics record.
///
/// The event payload carries only the recipient address, so correlation
/// is best-effort by email and recency. The fallback never touches
/// another subscriber's records, only an older row of the same one.
#[tracing::instrument(name = "Handle email delivery webhook", skip(state, req, body))]
#[post("/email")]
async fn email(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> RestResult<impl Responder> {
    let headers = req.headers();
    let signature = header_str(headers, SIGNATURE_HEADER)?;
    let timestamp = header_str(headers, TIMESTAMP_HEADER)?;
    header_str(headers, ID_HEADER)?;

    state
        .webhook_verifier
        .verify(timestamp, signature, &body, Utc::now())
        .map_err(|error| {
            tracing::warn!(error = %error, "Rejected webhook with invalid signature");
            RestError::Unauthorized("Invalid webhook signature".into())
        })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|error| RestError::ParseError(format!("Malformed webhook body: {}", error)))?;

    let Some(recipient) = event.data.to.first() else {
        return Err(RestError::ParseError("Event has no recipient".into()));
    };

    let stamp = match event.kind.as_str() {
        "email.delivered" => EventStamp::Delivered,
        "email.opened" => EventStamp::Opened,
        "email.clicked" => EventStamp::Clicked,
        "email.bounced" | "email.complained" => EventStamp::Bounced,
        // Everything else (email.sent, email.delivery_delayed, future
        // types) is acknowledged without mutation
        other => {
            tracing::debug!(event_type = other, "Acknowledged webhook without processing");
            return Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })));
        }
    };

    let record = match state.analytics.latest_undelivered_for_email(recipient).await? {
        Some(record) => Some(record),
        None => state.analytics.latest_for_email(recipient).await?,
    };
    let Some(record) = record else {
        return Err(RestError::NotFound(
            "No analytics record for recipient".into(),
        ));
    };

    let now = Utc::now();
    // Repeated events overwrite earlier timestamps: last-write-wins
    state.analytics.stamp(record.id, stamp, now).await?;

    match event.kind.as_str() {
        "email.bounced" => {
            state
                .subscribers
                .set_status_by_email(recipient, SubscriberStatus::Inactive, now)
                .await?;
        }
        "email.complained" => {
            state
                .subscribers
                .set_status_by_email(recipient, SubscriberStatus::Unsubscribed, now)
                .await?;
        }
        _ => {}
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}

/// Webhook API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/webhooks").service(email)
}
