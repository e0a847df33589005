use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::client::{StravaClient, StravaError, StravaPayload};

use super::{CacheStore, StravaCacheEntry};

/// In-process entries older than this are considered stale
const SESSION_TTL_SECS: i64 = 60;

/// Injected clock so tests can steer the TTL and cooldown windows
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    payload: StravaPayload,
    cached_at: DateTime<Utc>,
}

/// Two-tier cache in front of the rate-limited Strava proxy.
///
/// The in-process tier answers rapid repeated calls within one session;
/// the persistent tier survives restarts and carries the last-call
/// timestamp that gates fresh API calls. Stale-but-present data always
/// wins over a transient or rate-limited upstream failure; only a cold
/// cache combined with a hard failure surfaces an error.
pub struct StravaCache<S, C = SystemClock> {
    client: StravaClient,
    store: S,
    clock: C,
    cooldown: chrono::Duration,
    session: Mutex<Option<SessionEntry>>,
}

impl<S, C> StravaCache<S, C>
where
    S: CacheStore,
    C: Clock,
{
    pub fn new(client: StravaClient, store: S, clock: C, cooldown: Duration) -> Self {
        let cooldown = chrono::Duration::from_std(cooldown)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 2));
        Self {
            client,
            store,
            clock,
            cooldown,
            session: Mutex::new(None),
        }
    }

    /// Whether the rate-limit gate currently permits a fresh API call.
    /// Driven purely by the persisted last-call timestamp, not by how
    /// fresh the cached payload is.
    pub fn can_make_api_call(&self, persisted: Option<&StravaCacheEntry>, now: DateTime<Utc>) -> bool {
        match persisted {
            Some(entry) => now - entry.last_api_call_at >= self.cooldown,
            None => true,
        }
    }

    #[tracing::instrument(name = "Get Strava data", skip(self))]
    pub async fn get_data(&self) -> Result<StravaPayload, StravaError> {
        let now = self.clock.now();

        if let Some(payload) = self.fresh_session_payload(now) {
            return Ok(payload);
        }

        let persisted = self.store.load().unwrap_or_else(|error| {
            tracing::warn!(error = %error, "Failed to load persistent Strava cache");
            None
        });

        if let Some(entry) = &persisted {
            if !self.can_make_api_call(Some(entry), now) {
                tracing::debug!("API call gated by cooldown, serving persisted cache");
                return Ok(self.serve_entry(entry, now));
            }
        }

        match self.client.fetch().await {
            Ok(payload) => {
                let entry = StravaCacheEntry {
                    stats: payload.stats.clone(),
                    activities: payload.activities.clone(),
                    cached_at: now,
                    last_api_call_at: now,
                };
                self.persist(&entry);
                self.refresh_session(payload.clone(), now);
                Ok(payload)
            }
            Err(StravaError::RateLimited) => match persisted {
                Some(mut entry) => {
                    tracing::warn!("Strava API rate limited, serving persisted cache");
                    // Push the gate forward so the next calls back off too
                    entry.last_api_call_at = now;
                    self.persist(&entry);
                    Ok(self.serve_entry(&entry, now))
                }
                None => Err(StravaError::RateLimited),
            },
            // Auth failures are configuration problems, never masked by
            // cached data
            Err(StravaError::Auth) => Err(StravaError::Auth),
            Err(error) => match persisted {
                Some(entry) => {
                    tracing::warn!(error = %error, "Strava fetch failed, serving persisted cache");
                    Ok(self.serve_entry(&entry, now))
                }
                None => Err(error),
            },
        }
    }

    fn fresh_session_payload(&self, now: DateTime<Utc>) -> Option<StravaPayload> {
        let session = self.session.lock().unwrap();
        session
            .as_ref()
            .filter(|entry| (now - entry.cached_at).num_seconds() < SESSION_TTL_SECS)
            .map(|entry| entry.payload.clone())
    }

    fn serve_entry(&self, entry: &StravaCacheEntry, now: DateTime<Utc>) -> StravaPayload {
        let payload = StravaPayload {
            stats: entry.stats.clone(),
            activities: entry.activities.clone(),
        };
        self.refresh_session(payload.clone(), now);
        payload
    }

    fn refresh_session(&self, payload: StravaPayload, now: DateTime<Utc>) {
        *self.session.lock().unwrap() = Some(SessionEntry {
            payload,
            cached_at: now,
        });
    }

    fn persist(&self, entry: &StravaCacheEntry) {
        if let Err(error) = self.store.save(entry) {
            tracing::warn!(error = %error, "Failed to persist Strava cache");
        }
    }
}
