pub mod database;
pub mod discussion;
pub mod editor;
pub mod enrichment;
pub mod fixture_cache;
pub mod ledger;
pub mod lock;
pub mod publisher;
pub mod source;

use std::sync::Arc;
use std::time::Duration;

use matchbot_football::{Fixture, FootballError, Team, format_form};
use matchbot_lemmy::{CommunityId, LemmyError, NewPost};
use matchbot_util_error::FmtCompact as _;
use snafu::{ResultExt as _, Snafu};
use time::{OffsetDateTime, UtcOffset};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::discussion::{DiscussionSettings, RotationOutcome, rotate_discussion};
use crate::enrichment::{
    EnrichmentJob, EnrichmentOutcome, EnrichmentQueue, EnrichmentSettings, enrich_when_announced,
};
use crate::fixture_cache::FixtureCache;
use crate::ledger::{Ledger, fixture_key};
use crate::publisher::{Platform, with_signature};
use crate::source::FixtureSource;

pub const LOG_TARGET: &str = "matchbot::cycle";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CycleError {
    #[snafu(display("Could not fetch upcoming fixtures: {source}"))]
    Discover { source: FootballError },
    #[snafu(display("Could not publish match thread for fixture {fixture_id}: {source}"))]
    Publish {
        fixture_id: u64,
        source: LemmyError,
    },
}

pub type CycleResult<T> = std::result::Result<T, CycleError>;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub team_id: u64,
    pub community_id: CommunityId,
    /// How many upcoming fixtures to look at.
    pub fixture_count: u32,
    /// How many past matches make up a team's form.
    pub form_count: u32,
    /// Match threads go up once kickoff is closer than this.
    pub post_window: time::Duration,
    pub lineup_lead: time::Duration,
    pub lineup_attempts: usize,
    pub lineup_retry_interval: Duration,
    pub discussion_title: String,
    pub discussion_body: String,
    /// Appended to every post body.
    pub signature: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            team_id: 40,
            community_id: CommunityId(11742),
            fixture_count: 3,
            form_count: 8,
            post_window: time::Duration::hours(4),
            lineup_lead: time::Duration::minutes(55),
            lineup_attempts: 5,
            lineup_retry_interval: Duration::from_secs(120),
            discussion_title: "Weekly Discussion Thread".to_owned(),
            discussion_body: "What's on your mind?".to_owned(),
            signature: "~posted~ ~by~ ~matchbot~".to_owned(),
        }
    }
}

impl BotConfig {
    pub fn enrichment_settings(&self) -> EnrichmentSettings {
        EnrichmentSettings {
            team_id: self.team_id,
            lead: self.lineup_lead,
            attempts: self.lineup_attempts,
            retry_interval: self.lineup_retry_interval,
            signature: self.signature.clone(),
        }
    }

    pub fn discussion_settings(&self) -> DiscussionSettings {
        DiscussionSettings {
            community_id: self.community_id,
            title_prefix: self.discussion_title.clone(),
            body: self.discussion_body.clone(),
            signature: self.signature.clone(),
        }
    }
}

/// What a cycle did, for logging and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Fixture ids that got a new match thread.
    pub published: Vec<u64>,
    pub enriched: usize,
    pub abandoned: usize,
    pub edit_failed: usize,
    pub discussion: Option<RotationOutcome>,
    /// Units of work (discovery, a fixture, the discussion) that failed.
    pub failures: usize,
}

pub struct Bot {
    config: BotConfig,
    source: Arc<dyn FixtureSource>,
    platform: Arc<dyn Platform>,
    cache: Option<FixtureCache>,
}

impl Bot {
    pub fn new(
        config: BotConfig,
        source: Arc<dyn FixtureSource>,
        platform: Arc<dyn Platform>,
    ) -> Self {
        Self {
            config,
            source,
            platform,
            cache: None,
        }
    }

    pub fn with_fixture_cache(mut self, cache: FixtureCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// One polling pass.
    ///
    /// `now` is captured once by the caller and used for every time
    /// comparison in the pass. Lineup polling is scheduled on the monotonic
    /// clock from the moment the pass starts, so time spent publishing does
    /// not delay it. Failures of individual fixtures or of the
    /// discussion rotation are logged and counted, never propagated, so one
    /// of them cannot hold back the others. Returns once every lineup
    /// enrichment started or resumed here has finished.
    pub async fn run_one_cycle(
        &self,
        ledger: &mut Ledger,
        queue: &mut EnrichmentQueue,
        now: OffsetDateTime,
    ) -> CycleReport {
        info!(target: LOG_TARGET, %now, "Starting cycle");
        let started = tokio::time::Instant::now();
        let mut report = CycleReport::default();
        let settings = Arc::new(self.config.enrichment_settings());
        let mut enrichments = JoinSet::new();

        for job in queue.take_resumable(now).await {
            info!(target: LOG_TARGET, fixture_id = job.fixture_id(), "Resuming lineup enrichment");
            self.spawn_enrichment(&mut enrichments, job, &settings, now, started);
        }

        match self.discover_fixtures(now).await {
            Ok(fixtures) => {
                for fixture in fixtures {
                    let fixture_id = fixture.id();
                    if !self.is_due(&fixture, ledger, now) {
                        continue;
                    }

                    match self.publish_match_thread(fixture).await {
                        Ok(job) => {
                            report.published.push(fixture_id);
                            if let Err(err) = ledger.record(fixture_key(fixture_id)).await {
                                error!(target: LOG_TARGET, fixture_id, err = %err.fmt_compact(), "Match thread posted but not recorded; it may be posted again");
                            }
                            queue.push(job.clone()).await;
                            self.spawn_enrichment(&mut enrichments, job, &settings, now, started);
                        }
                        Err(err) => {
                            report.failures += 1;
                            error!(target: LOG_TARGET, fixture_id, err = %err.fmt_compact(), "Failed to post match thread");
                        }
                    }
                }
            }
            Err(err) => {
                report.failures += 1;
                error!(target: LOG_TARGET, err = %err.fmt_compact(), "Fixture discovery failed");
            }
        }

        match rotate_discussion(
            self.platform.as_ref(),
            ledger,
            &self.config.discussion_settings(),
            now,
        )
        .await
        {
            Ok(outcome) => report.discussion = Some(outcome),
            Err(err) => {
                report.failures += 1;
                error!(target: LOG_TARGET, err = %err.fmt_compact(), "Weekly discussion rotation failed");
            }
        }

        if !enrichments.is_empty() {
            info!(target: LOG_TARGET, pending = enrichments.len(), "Waiting for lineup enrichments");
        }
        while let Some(res) = enrichments.join_next().await {
            match res {
                Ok((fixture_id, outcome)) => {
                    match outcome {
                        EnrichmentOutcome::Enriched => report.enriched += 1,
                        EnrichmentOutcome::Abandoned => report.abandoned += 1,
                        EnrichmentOutcome::EditFailed => report.edit_failed += 1,
                    }
                    queue.complete(fixture_id).await;
                }
                Err(err) => {
                    error!(target: LOG_TARGET, err = %err.fmt_compact(), "Lineup enrichment task failed");
                }
            }
        }

        info!(
            target: LOG_TARGET,
            published = report.published.len(),
            enriched = report.enriched,
            abandoned = report.abandoned,
            failures = report.failures,
            "Cycle complete"
        );
        report
    }

    fn is_due(&self, fixture: &Fixture, ledger: &Ledger, now: OffsetDateTime) -> bool {
        let fixture_id = fixture.id();
        if now + self.config.post_window <= fixture.kickoff() {
            debug!(target: LOG_TARGET, fixture_id, kickoff = %fixture.kickoff(), "Fixture not in posting window yet");
            return false;
        }
        if ledger.contains(&fixture_key(fixture_id)) {
            debug!(target: LOG_TARGET, fixture_id, "Match thread already posted");
            return false;
        }
        true
    }

    async fn discover_fixtures(&self, now: OffsetDateTime) -> CycleResult<Vec<Fixture>> {
        if let Some(cache) = &self.cache {
            if let Some(fixtures) = cache.load_for(now.to_offset(UtcOffset::UTC).date()).await {
                return Ok(fixtures);
            }
        }

        let fixtures = self
            .source
            .upcoming_fixtures(self.config.team_id, self.config.fixture_count)
            .await
            .context(DiscoverSnafu)?;
        debug!(target: LOG_TARGET, count = fixtures.len(), "Fetched upcoming fixtures");

        if let Some(cache) = &self.cache {
            cache.store(&fixtures, now).await;
        }
        Ok(fixtures)
    }

    /// Form block for `team`, or `None` if it could not be fetched.
    async fn team_form(&self, team: &Team) -> Option<String> {
        match self
            .source
            .recent_fixtures(team.id, self.config.form_count)
            .await
        {
            Ok(recent) => Some(format_form(&team.name, team.id, &recent)),
            Err(err) => {
                warn!(target: LOG_TARGET, team_id = team.id, err = %err.fmt_compact(), "Could not fetch form, posting without it");
                None
            }
        }
    }

    async fn publish_match_thread(&self, fixture: Fixture) -> CycleResult<EnrichmentJob> {
        let fixture_id = fixture.id();
        let home_form = self.team_form(&fixture.teams.home).await;
        let away_form = self.team_form(&fixture.teams.away).await;

        let title = fixture.format_title();
        let body = fixture.format_body(home_form.as_deref(), away_form.as_deref(), None);
        let post_id = self
            .platform
            .publish(&NewPost {
                name: title.clone(),
                community_id: self.config.community_id,
                body: with_signature(&body, &self.config.signature),
                nsfw: false,
            })
            .await
            .context(PublishSnafu { fixture_id })?;

        info!(target: LOG_TARGET, fixture_id, %post_id, %title, "Match thread posted");
        Ok(EnrichmentJob {
            fixture,
            post_id,
            home_form,
            away_form,
        })
    }

    fn spawn_enrichment(
        &self,
        set: &mut JoinSet<(u64, EnrichmentOutcome)>,
        job: EnrichmentJob,
        settings: &Arc<EnrichmentSettings>,
        now: OffsetDateTime,
        started: tokio::time::Instant,
    ) {
        let source = self.source.clone();
        let platform = self.platform.clone();
        let settings = settings.clone();
        let poll_at = settings.poll_start(&job, now, started);
        set.spawn(async move {
            let outcome =
                enrich_when_announced(&job, source.as_ref(), platform.as_ref(), &settings, poll_at)
                    .await;
            (job.fixture_id(), outcome)
        });
    }
}
