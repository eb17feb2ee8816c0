//! Same-day cache of upcoming fixtures.
//!
//! Purely an API quota saver: every failure here is logged and treated as a
//! cache miss.

use std::path::PathBuf;

use matchbot_football::Fixture;
use matchbot_util_error::FmtCompact as _;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::{debug, warn};

const LOG_TARGET: &str = "matchbot::fixture_cache";

#[derive(Debug, Serialize, Deserialize)]
struct CachedFixtures {
    fixtures: Vec<Fixture>,
    #[serde(with = "time::serde::rfc3339")]
    date_fetched: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct FixtureCache {
    path: PathBuf,
}

impl FixtureCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cached fixtures, if they were fetched on `today` (UTC).
    pub async fn load_for(&self, today: Date) -> Option<Vec<Fixture>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(target: LOG_TARGET, path = %self.path.display(), err = %err.fmt_compact(), "Could not read fixture cache");
                return None;
            }
        };

        let cached: CachedFixtures = match serde_json::from_slice(&bytes) {
            Ok(cached) => cached,
            Err(err) => {
                warn!(target: LOG_TARGET, path = %self.path.display(), err = %err.fmt_compact(), "Ignoring malformed fixture cache");
                return None;
            }
        };

        let fetched_on = cached.date_fetched.to_offset(UtcOffset::UTC).date();
        if fetched_on != today {
            debug!(target: LOG_TARGET, %fetched_on, %today, "Fixture cache is stale");
            return None;
        }

        debug!(target: LOG_TARGET, len = cached.fixtures.len(), "Serving fixtures from cache");
        Some(cached.fixtures)
    }

    pub async fn store(&self, fixtures: &[Fixture], fetched_at: OffsetDateTime) {
        let cached = CachedFixtures {
            fixtures: fixtures.to_vec(),
            date_fetched: fetched_at,
        };

        let bytes = match serde_json::to_vec_pretty(&cached) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Could not serialize fixture cache");
                return;
            }
        };

        if let Err(err) = tokio::fs::write(&self.path, bytes).await {
            warn!(target: LOG_TARGET, path = %self.path.display(), err = %err.fmt_compact(), "Could not write fixture cache");
        }
    }
}
