use url::Url;

use super::escape_html;

const PAGE_STYLES: &str = "\
    body{margin:0;padding:48px 16px;background-color:#f4f4f7;\
font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Helvetica,Arial,sans-serif;\
color:#24292f;text-align:center;}\
    .card{max-width:480px;margin:0 auto;background-color:#ffffff;\
border-radius:8px;padding:32px;}\
    a{color:#0969da;}";

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
<title>{title}</title>\n<style>{PAGE_STYLES}</style>\n</head>\n<body>\n\
<div class=\"card\">\n{body}</div>\n</body>\n</html>\n"
    )
}

/// Confirmation page shown after a successful (or repeated) unsubscribe
pub fn unsubscribe_confirmation_page(site_base_url: &Url) -> String {
    let body = format!(
        "<h1>You're unsubscribed</h1>\n\
<p>You will no longer receive new-content emails from this site.</p>\n\
<p>Changed your mind? You can <a href=\"{}\">resubscribe on the site</a> at any time.</p>\n",
        escape_html(site_base_url.as_str())
    );
    page("Unsubscribed", &body)
}

/// Generic, non-technical error page for unsubscribe failures
pub fn unsubscribe_error_page(title: &str, message: &str, site_base_url: &Url) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"{}\">Back to the site</a></p>\n",
        escape_html(title),
        escape_html(message),
        escape_html(site_base_url.as_str())
    );
    page(title, &body)
}
