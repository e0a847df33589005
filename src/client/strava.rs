use std::time::Duration;

use chrono::{DateTime, Utc};

use reqwest::{Client, StatusCode};

use serde::{Deserialize, Serialize};

use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum StravaError {
    #[error("Strava API rate limit exceeded")]
    RateLimited,
    #[error("Strava API authentication failed")]
    Auth,
    #[error("Failed to call Strava proxy: {0}")]
    Request(#[from] reqwest::Error),
}

/// Aggregate run totals as reported by the athlete stats endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaTotals {
    pub count: u32,
    pub distance: f64,
    pub moving_time: u64,
    pub elevation_gain: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaStats {
    pub recent_run_totals: StravaTotals,
    pub all_run_totals: StravaTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaActivity {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub distance: f64,
    pub moving_time: u64,
    pub start_date: DateTime<Utc>,
}

/// A full stats snapshot: totals plus the most recent activities, in the
/// order the proxy returns them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaPayload {
    pub stats: StravaStats,
    pub activities: Vec<StravaActivity>,
}

/// Client for the rate-limited Strava stats proxy.
/// Maps the two actionable upstream statuses onto their own error
/// variants so the cache can pick a fallback strategy per failure.
#[derive(Debug)]
pub struct StravaClient {
    client: Client,
    proxy_url: Url,
}

impl StravaClient {
    pub fn new(proxy_url: Url, api_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(api_timeout).build()?;

        Ok(Self { client, proxy_url })
    }

    #[tracing::instrument(name = "Fetch Strava stats via proxy", skip(self))]
    pub async fn fetch(&self) -> Result<StravaPayload, StravaError> {
        let response = self.client.get(self.proxy_url.clone()).send().await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(StravaError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(StravaError::Auth),
            _ => {
                let payload = response.error_for_status()?.json().await?;
                Ok(payload)
            }
        }
    }
}
