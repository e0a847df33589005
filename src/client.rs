mod email_client;
mod strava;

pub use email_client::{EmailClient, OutboundEmail};
pub use strava::{StravaActivity, StravaClient, StravaError, StravaPayload, StravaStats, StravaTotals};
