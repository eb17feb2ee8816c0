//! Lineup enrichment of published match threads.
//!
//! After a match thread goes up, a job waits until shortly before kickoff,
//! polls for the tracked team's lineup a bounded number of times and edits
//! the post once the lineup is out. Jobs are also written to a small JSON
//! queue so a restarted process can pick up the ones that are still useful.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable as _};
use matchbot_football::{Fixture, FootballError, TeamLineup};
use matchbot_lemmy::{PostEdit, PostId};
use matchbot_util_error::FmtCompact as _;
use serde::{Deserialize, Serialize};
use snafu::Snafu;
use time::OffsetDateTime;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::publisher::{Platform, with_signature};
use crate::source::FixtureSource;

const LOG_TARGET: &str = "matchbot::enrichment";

/// A published match thread waiting for its lineup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentJob {
    pub fixture: Fixture,
    pub post_id: PostId,
    /// Form blocks as they were published, so the edit keeps them.
    #[serde(default)]
    pub home_form: Option<String>,
    #[serde(default)]
    pub away_form: Option<String>,
}

impl EnrichmentJob {
    pub fn fixture_id(&self) -> u64 {
        self.fixture.id()
    }

    /// Post body, with the lineup block when there is one.
    pub fn body(&self, lineup: Option<&TeamLineup>, signature: &str) -> String {
        let lineup = lineup.map(TeamLineup::format_lineup);
        let body = self.fixture.format_body(
            self.home_form.as_deref(),
            self.away_form.as_deref(),
            lineup.as_deref(),
        );
        with_signature(&body, signature)
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub team_id: u64,
    /// How long before kickoff to start polling.
    pub lead: time::Duration,
    pub attempts: usize,
    pub retry_interval: Duration,
    pub signature: String,
}

impl EnrichmentSettings {
    /// Monotonic instant at which polling for `job` starts, `lead` before
    /// kickoff. `now` is the wall clock reading taken at `started`; a start
    /// in the past maps to `started`.
    pub fn poll_start(&self, job: &EnrichmentJob, now: OffsetDateTime, started: Instant) -> Instant {
        let until_start = job.fixture.kickoff() - self.lead - now;
        if until_start.is_positive() {
            started + until_start.unsigned_abs()
        } else {
            started
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    Enriched,
    /// No lineup within the allowed attempts; the post stays as published.
    Abandoned,
    EditFailed,
}

#[derive(Debug, Snafu)]
enum PollError {
    #[snafu(display("Lineup not announced yet"))]
    NotYetAvailable,
    #[snafu(display("Lineup fetch failed: {source}"))]
    Fetch { source: FootballError },
}

/// Run one job to completion, polling from `poll_at` on (see
/// [`EnrichmentSettings::poll_start`]). Never fails: every problem ends up
/// as an [`EnrichmentOutcome`] and a log line.
pub async fn enrich_when_announced(
    job: &EnrichmentJob,
    fixtures: &dyn FixtureSource,
    platform: &dyn Platform,
    settings: &EnrichmentSettings,
    poll_at: Instant,
) -> EnrichmentOutcome {
    let fixture_id = job.fixture_id();
    if Instant::now() < poll_at {
        debug!(
            target: LOG_TARGET,
            fixture_id,
            wait_secs = (poll_at - Instant::now()).as_secs(),
            "Waiting for lineup window"
        );
        tokio::time::sleep_until(poll_at).await;
    }

    let team_id = settings.team_id;
    let lineup = (move || async move {
        match fixtures.lineup(fixture_id).await {
            Ok(status) => status.into_team(team_id).ok_or(PollError::NotYetAvailable),
            Err(source) => Err(PollError::Fetch { source }),
        }
    })
    .retry(
        ConstantBuilder::default()
            .with_delay(settings.retry_interval)
            .with_max_times(settings.attempts.saturating_sub(1)),
    )
    .sleep(tokio::time::sleep)
    .notify(|e, _| debug!(target: LOG_TARGET, fixture_id, err = %e.fmt_compact(), "Lineup not ready, retrying"))
    .await;

    let lineup = match lineup {
        Ok(lineup) => lineup,
        Err(err) => {
            info!(
                target: LOG_TARGET,
                fixture_id,
                attempts = settings.attempts,
                err = %err.fmt_compact(),
                "Giving up on lineup"
            );
            return EnrichmentOutcome::Abandoned;
        }
    };

    let edit = PostEdit::body(job.post_id, job.body(Some(&lineup), &settings.signature));
    match platform.edit(&edit).await {
        Ok(_) => {
            info!(target: LOG_TARGET, fixture_id, post_id = %job.post_id, "Match thread updated with lineup");
            EnrichmentOutcome::Enriched
        }
        Err(err) => {
            warn!(target: LOG_TARGET, fixture_id, post_id = %job.post_id, err = %err.fmt_compact(), "Could not edit match thread");
            EnrichmentOutcome::EditFailed
        }
    }
}

/// Pending jobs, optionally mirrored to a JSON file.
///
/// The file is a best-effort record: failing to read or write it only costs
/// the ability to resume after a restart, so errors are logged, not
/// returned.
#[derive(Debug, Default)]
pub struct EnrichmentQueue {
    path: Option<PathBuf>,
    jobs: BTreeMap<u64, EnrichmentJob>,
}

impl EnrichmentQueue {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let jobs = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<EnrichmentJob>>(&bytes) {
                Ok(jobs) => jobs,
                Err(err) => {
                    warn!(target: LOG_TARGET, path = %path.display(), err = %err.fmt_compact(), "Ignoring malformed enrichment queue");
                    vec![]
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => vec![],
            Err(err) => {
                warn!(target: LOG_TARGET, path = %path.display(), err = %err.fmt_compact(), "Could not read enrichment queue");
                vec![]
            }
        };

        Self {
            path: Some(path),
            jobs: jobs.into_iter().map(|job| (job.fixture_id(), job)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, fixture_id: u64) -> bool {
        self.jobs.contains_key(&fixture_id)
    }

    pub async fn push(&mut self, job: EnrichmentJob) {
        self.jobs.insert(job.fixture_id(), job);
        self.persist().await;
    }

    pub async fn complete(&mut self, fixture_id: u64) {
        if self.jobs.remove(&fixture_id).is_some() {
            self.persist().await;
        }
    }

    /// Drop jobs whose kickoff has passed and return the rest, to be run
    /// again.
    pub async fn take_resumable(&mut self, now: OffsetDateTime) -> Vec<EnrichmentJob> {
        let before = self.jobs.len();
        self.jobs.retain(|fixture_id, job| {
            let keep = now < job.fixture.kickoff();
            if !keep {
                info!(target: LOG_TARGET, fixture_id, "Dropping enrichment of a match that already kicked off");
            }
            keep
        });
        if self.jobs.len() != before {
            self.persist().await;
        }
        self.jobs.values().cloned().collect()
    }

    async fn persist(&self) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        let jobs: Vec<&EnrichmentJob> = self.jobs.values().collect();
        let bytes = match serde_json::to_vec_pretty(&jobs) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Could not serialize enrichment queue");
                return;
            }
        };

        let tmp_path = path.with_extension("tmp");
        let res = match tokio::fs::write(&tmp_path, bytes).await {
            Ok(()) => tokio::fs::rename(&tmp_path, path).await,
            Err(err) => Err(err),
        };
        if let Err(err) = res {
            warn!(target: LOG_TARGET, path = %path.display(), err = %err.fmt_compact(), "Could not write enrichment queue");
        }
    }
}

#[cfg(test)]
mod tests {
    use matchbot_football::{FixtureDetails, Goals, League, Status, Team, Teams, Venue};
    use time::macros::datetime;

    use super::*;

    fn job(id: u64, kickoff: OffsetDateTime) -> EnrichmentJob {
        EnrichmentJob {
            fixture: Fixture {
                fixture: FixtureDetails {
                    id,
                    referee: None,
                    timezone: "UTC".into(),
                    date: kickoff,
                    timestamp: kickoff.unix_timestamp(),
                    venue: Venue::default(),
                    status: Status {
                        long: "Not Started".into(),
                        short: "NS".into(),
                    },
                },
                league: League {
                    id: 39,
                    name: "Premier League".into(),
                    country: "England".into(),
                    round: "Regular Season - 9".into(),
                    season: 2026,
                },
                teams: Teams {
                    home: Team {
                        id: 40,
                        name: "Liverpool".into(),
                        winner: None,
                    },
                    away: Team {
                        id: 49,
                        name: "Chelsea".into(),
                        winner: None,
                    },
                },
                goals: Goals::default(),
            },
            post_id: PostId(7),
            home_form: Some("::: spoiler Liverpool form\n:::".into()),
            away_form: None,
        }
    }

    #[test]
    fn body_keeps_form_and_signature() {
        let job = job(501, datetime!(2026-10-19 15:00 UTC));
        let body = job.body(None, "~sig~");
        assert!(body.contains("::: spoiler Liverpool form"));
        assert!(body.ends_with("\n\n~sig~"));
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn poll_start_is_anchored_to_cycle_start() {
        let settings = EnrichmentSettings {
            team_id: 40,
            lead: time::Duration::minutes(55),
            attempts: 5,
            retry_interval: Duration::from_secs(120),
            signature: "~sig~".into(),
        };
        let now = datetime!(2026-10-19 12:00 UTC);
        let started = Instant::now();
        tokio::time::advance(Duration::from_secs(600)).await;

        let upcoming = job(1, datetime!(2026-10-19 14:00 UTC));
        assert_eq!(
            settings.poll_start(&upcoming, now, started),
            started + Duration::from_secs(65 * 60)
        );

        let imminent = job(2, datetime!(2026-10-19 12:30 UTC));
        assert_eq!(settings.poll_start(&imminent, now, started), started);
    }

    #[test_log::test(tokio::test)]
    async fn queue_resumes_only_future_kickoffs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending_enrichments.json");
        let now = datetime!(2026-10-19 12:00 UTC);

        {
            let mut queue = EnrichmentQueue::load(&path).await;
            assert!(queue.is_empty());
            queue.push(job(1, datetime!(2026-10-19 11:00 UTC))).await;
            queue.push(job(2, datetime!(2026-10-19 15:00 UTC))).await;
            queue.push(job(3, datetime!(2026-10-19 16:00 UTC))).await;
            queue.complete(3).await;
        }

        let mut queue = EnrichmentQueue::load(&path).await;
        assert_eq!(queue.len(), 2);

        let resumed = queue.take_resumable(now).await;
        assert_eq!(resumed.len(), 1);
        assert_eq!(resumed[0].fixture_id(), 2);
        assert!(!queue.contains(1));

        let queue = EnrichmentQueue::load(&path).await;
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(2));
    }

    #[test_log::test(tokio::test)]
    async fn malformed_queue_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending_enrichments.json");
        std::fs::write(&path, "[{").unwrap();

        let queue = EnrichmentQueue::load(&path).await;
        assert!(queue.is_empty());
    }
}
