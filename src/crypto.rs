mod webhook;

pub use webhook::{SignatureError, WebhookVerifier};
