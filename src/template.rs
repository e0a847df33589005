mod blog_post;
mod pages;
mod project;

pub use blog_post::{render_blog_post_email, BlogPostEmail};
pub use pages::{unsubscribe_confirmation_page, unsubscribe_error_page};
pub use project::{render_project_email, ProjectEmail};

use url::Url;

/// Build the self-service unsubscribe link, embedding the literal token
/// as a query parameter
pub(crate) fn unsubscribe_url(site_base_url: &Url, token: &str) -> String {
    let base = site_base_url.as_str().trim_end_matches('/');
    format!("{}/unsubscribe?token={}", base, token)
}

/// Minimal HTML text escaping for interpolated content
pub(crate) fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Shared inline stylesheet, including the mobile media query, so the
/// rendered documents need no external resources
pub(crate) const EMAIL_STYLES: &str = "\
    body{margin:0;padding:0;background-color:#f4f4f7;\
font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Helvetica,Arial,sans-serif;\
color:#24292f;}\
    .wrapper{width:100%;background-color:#f4f4f7;padding:24px 0;}\
    .container{max-width:600px;margin:0 auto;background-color:#ffffff;\
border-radius:8px;overflow:hidden;}\
    .header{background-color:#1f2328;color:#ffffff;padding:24px 32px;}\
    .header h1{margin:0;font-size:20px;}\
    .content{padding:32px;}\
    .content h2{margin-top:0;font-size:24px;}\
    .content p{line-height:1.6;}\
    .hero{width:100%;height:auto;display:block;}\
    .tag{display:inline-block;background-color:#eef1f4;color:#57606a;\
border-radius:12px;padding:2px 10px;margin:0 6px 6px 0;font-size:12px;}\
    .button{display:inline-block;background-color:#0969da;color:#ffffff;\
text-decoration:none;padding:12px 24px;border-radius:6px;font-weight:600;}\
    .footer{padding:24px 32px;font-size:12px;color:#57606a;text-align:center;}\
    .footer a{color:#57606a;}\
    @media only screen and (max-width:620px){\
.container{width:100%!important;border-radius:0!important;}\
.content{padding:16px!important;}\
.header{padding:16px!important;}}";

pub(crate) fn render_tags(html: &mut String, tags: &[String]) {
    if tags.is_empty() {
        return;
    }
    html.push_str("<p>");
    for tag in tags {
        html.push_str("<span class=\"tag\">");
        html.push_str(&escape_html(tag));
        html.push_str("</span>");
    }
    html.push_str("</p>\n");
}

pub(crate) fn render_footer(html: &mut String, recipient: &str, unsubscribe_url: &str) {
    html.push_str("<div class=\"footer\">\n<p>This email was sent to ");
    html.push_str(&escape_html(recipient));
    html.push_str(".</p>\n<p><a href=\"");
    html.push_str(&escape_html(unsubscribe_url));
    html.push_str("\">Unsubscribe</a></p>\n</div>\n");
}
