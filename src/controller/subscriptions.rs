use actix_web::dev::HttpServiceFactory;
use actix_web::{post, web, HttpResponse, Responder};

use serde::Deserialize;

use crate::app::AppState;
use crate::domain::EmailAddress;
use crate::error::{RestError, RestResult};
use crate::model::NewSubscriber;
use crate::repo::RepoError;

#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    email: String,
}

#[tracing::instrument(name = "Create a newsletter subscriber", skip(state, form))]
#[post("")]
async fn create(
    state: web::Data<AppState>,
    form: web::Form<SubscribeForm>,
) -> RestResult<impl Responder> {
    let email: EmailAddress = form.email.parse().map_err(RestError::ParseError)?;

    let new_subscriber = NewSubscriber::new(email);

    match state.subscribers.insert(&new_subscriber).await {
        Ok(id) => {
            tracing::info!(subscriber_id = %id, "New subscriber created");
            Ok(HttpResponse::Created().finish())
        }
        // A repeated signup is not an error from the visitor's side
        Err(RepoError::Duplicate(_)) => Ok(HttpResponse::Ok().body("Already subscribed")),
        Err(error) => Err(error.into()),
    }
}

/// Subscriptions API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/subscriptions").service(create)
}
