use url::Url;

use uuid::Uuid;

use super::{escape_html, render_footer, render_tags, unsubscribe_url, EMAIL_STYLES};

/// Inputs for a project-announcement email, mirrors `BlogPostEmail`
#[derive(Debug)]
pub struct ProjectEmail<'a> {
    pub recipient: &'a str,
    pub unsubscribe_token: &'a str,
    pub site_base_url: &'a Url,
    pub title: &'a str,
    pub project_id: Uuid,
    pub description: &'a str,
    pub tags: &'a [String],
    pub image_url: Option<&'a str>,
    pub repo_url: Option<&'a str>,
}

pub fn render_project_email(email: &ProjectEmail<'_>) -> String {
    let base = email.site_base_url.as_str().trim_end_matches('/');
    let project_url = format!("{}/projects/{}", base, email.project_id);
    let unsubscribe = unsubscribe_url(email.site_base_url, email.unsubscribe_token);
    let title = escape_html(email.title);

    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str("<title>");
    html.push_str(&title);
    html.push_str("</title>\n<style>");
    html.push_str(EMAIL_STYLES);
    html.push_str("</style>\n</head>\n<body>\n");

    html.push_str("<div class=\"wrapper\">\n<div class=\"container\">\n");
    html.push_str("<div class=\"header\"><h1>New Project</h1></div>\n");

    if let Some(image_url) = email.image_url {
        html.push_str("<img class=\"hero\" src=\"");
        html.push_str(&escape_html(image_url));
        html.push_str("\" alt=\"\">\n");
    }

    html.push_str("<div class=\"content\">\n<h2>");
    html.push_str(&title);
    html.push_str("</h2>\n<p>");
    html.push_str(&escape_html(email.description));
    html.push_str("</p>\n");

    render_tags(&mut html, email.tags);

    html.push_str("<p><a class=\"button\" href=\"");
    html.push_str(&escape_html(&project_url));
    html.push_str("\">View the project</a>");

    if let Some(repo_url) = email.repo_url {
        html.push_str(" &nbsp; <a href=\"");
        html.push_str(&escape_html(repo_url));
        html.push_str("\">Source code</a>");
    }

    html.push_str("</p>\n</div>\n");

    render_footer(&mut html, email.recipient, &unsubscribe);

    html.push_str("</div>\n</div>\n</body>\n</html>\n");
    html
}
