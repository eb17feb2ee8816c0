use async_trait::async_trait;
use matchbot_football::{Fixture, FootballClient, FootballResult, LineupStatus};

/// Where fixtures, form and lineups come from.
#[async_trait]
pub trait FixtureSource: Send + Sync {
    /// The next `count` fixtures of `team_id`, soonest first.
    async fn upcoming_fixtures(&self, team_id: u64, count: u32) -> FootballResult<Vec<Fixture>>;

    /// The last `count` fixtures of `team_id`, most recent first.
    async fn recent_fixtures(&self, team_id: u64, count: u32) -> FootballResult<Vec<Fixture>>;

    async fn lineup(&self, fixture_id: u64) -> FootballResult<LineupStatus>;
}

#[async_trait]
impl FixtureSource for FootballClient {
    async fn upcoming_fixtures(&self, team_id: u64, count: u32) -> FootballResult<Vec<Fixture>> {
        FootballClient::upcoming_fixtures(self, team_id, count).await
    }

    async fn recent_fixtures(&self, team_id: u64, count: u32) -> FootballResult<Vec<Fixture>> {
        FootballClient::recent_fixtures(self, team_id, count).await
    }

    async fn lineup(&self, fixture_id: u64) -> FootballResult<LineupStatus> {
        self.lineups(fixture_id).await
    }
}
