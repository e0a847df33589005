use chrono::{DateTime, Utc};

use url::Url;

use super::{escape_html, render_footer, render_tags, unsubscribe_url, EMAIL_STYLES};

/// Everything needed to render a new-blog-post notification email.
/// Pure data in, HTML document out; rendering touches no clock, store or
/// network, so identical input yields byte-identical output.
#[derive(Debug)]
pub struct BlogPostEmail<'a> {
    pub recipient: &'a str,
    pub unsubscribe_token: &'a str,
    pub site_base_url: &'a Url,
    pub title: &'a str,
    pub slug: &'a str,
    pub excerpt: Option<&'a str>,
    pub tags: &'a [String],
    pub image_url: Option<&'a str>,
    pub published_at: DateTime<Utc>,
}

pub fn render_blog_post_email(email: &BlogPostEmail<'_>) -> String {
    let base = email.site_base_url.as_str().trim_end_matches('/');
    let post_url = format!("{}/blog/{}", base, email.slug);
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
    html.push_str("<div class=\"header\"><h1>New Blog Post</h1></div>\n");

    if let Some(image_url) = email.image_url {
        html.push_str("<img class=\"hero\" src=\"");
        html.push_str(&escape_html(image_url));
        html.push_str("\" alt=\"\">\n");
    }

    html.push_str("<div class=\"content\">\n<h2>");
    html.push_str(&title);
    html.push_str("</h2>\n<p>Published on ");
    html.push_str(&email.published_at.format("%B %-d, %Y").to_string());
    html.push_str("</p>\n");

    if let Some(excerpt) = email.excerpt {
        html.push_str("<p>");
        html.push_str(&escape_html(excerpt));
        html.push_str("</p>\n");
    }

    render_tags(&mut html, email.tags);

    html.push_str("<p><a class=\"button\" href=\"");
    html.push_str(&escape_html(&post_url));
    html.push_str("\">Read the full post</a></p>\n</div>\n");

    render_footer(&mut html, email.recipient, &unsubscribe);

    html.push_str("</div>\n</div>\n</body>\n</html>\n");
    html
}
