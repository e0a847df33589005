use actix_web::dev::HttpServiceFactory;
use actix_web::{post, web, HttpResponse, Responder};

use serde::Deserialize;

use uuid::Uuid;

use crate::app::AppState;
use crate::error::{RestError, RestResult};
use crate::model::ContentType;
use crate::template::{
    render_blog_post_email, render_project_email, BlogPostEmail, ProjectEmail,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessBody {
    #[serde(default)]
    queue_ids: Option<Vec<Uuid>>,
}

/// Drain eligible queue items, or the explicitly listed ones.
/// Invoked on demand by admin tooling or on a schedule.
#[tracing::instrument(name = "Process the email queue", skip(state, body))]
#[post("/process")]
async fn process(
    state: web::Data<AppState>,
    body: Option<web::Json<ProcessBody>>,
) -> RestResult<impl Responder> {
    let queue_ids = body.and_then(|body| body.into_inner().queue_ids);

    let report = state.processor.process(queue_ids).await?;

    Ok(HttpResponse::Ok().json(report))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewBody {
    content_type: ContentType,
    content_id: Option<Uuid>,
    mode: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct PreviewResponse {
    html: String,
    title: String,
}

const PREVIEW_RECIPIENT: &str = "preview@example.com";
const PREVIEW_TOKEN: &str = "preview";

/// Render a template without sending anything, for admin tooling.
/// Either an explicit content id or `mode: "latest"` must be supplied.
#[tracing::instrument(name = "Preview an email template", skip(state))]
#[post("/preview")]
async fn preview(
    state: web::Data<AppState>,
    body: web::Json<PreviewBody>,
) -> RestResult<impl Responder> {
    let body = body.into_inner();

    let latest = body.mode.as_deref() == Some("latest");
    if body.content_id.is_none() && !latest {
        return Err(RestError::ParseError(
            "Either contentId or mode: \"latest\" is required".into(),
        ));
    }

    let response = match body.content_type {
        ContentType::BlogPost => {
            let post = match body.content_id {
                Some(id) => state.content.find_post(id).await?,
                None => state.content.latest_post().await?,
            }
            .ok_or_else(|| RestError::NotFound("No matching blog post".into()))?;

            let html = render_blog_post_email(&BlogPostEmail {
                recipient: PREVIEW_RECIPIENT,
                unsubscribe_token: PREVIEW_TOKEN,
                site_base_url: &state.site_base_url,
                title: &post.title,
                slug: &post.slug,
                excerpt: post.excerpt.as_deref(),
                tags: &post.tags,
                image_url: post.image_url.as_deref(),
                published_at: post.published_at,
            });
            PreviewResponse {
                html,
                title: post.title,
            }
        }
        ContentType::Project => {
            let project = match body.content_id {
                Some(id) => state.content.find_project(id).await?,
                None => state.content.latest_project().await?,
            }
            .ok_or_else(|| RestError::NotFound("No matching project".into()))?;

            let html = render_project_email(&ProjectEmail {
                recipient: PREVIEW_RECIPIENT,
                unsubscribe_token: PREVIEW_TOKEN,
                site_base_url: &state.site_base_url,
                title: &project.title,
                project_id: project.id,
                description: &project.description,
                tags: &project.tags,
                image_url: project.image_url.as_deref(),
                repo_url: project.repo_url.as_deref(),
            });
            PreviewResponse {
                html,
                title: project.title,
            }
        }
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Queue API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/queue").service(process).service(preview)
}
