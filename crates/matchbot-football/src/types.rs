use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One entry of the `/fixtures` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub fixture: FixtureDetails,
    pub league: League,
    pub teams: Teams,
    #[serde(default)]
    pub goals: Goals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureDetails {
    pub id: u64,
    #[serde(default)]
    pub referee: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Kickoff.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub timestamp: i64,
    #[serde(default)]
    pub venue: Venue,
    pub status: Status,
}

fn default_timezone() -> String {
    "UTC".to_owned()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub long: String,
    pub short: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub country: String,
    pub round: String,
    pub season: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teams {
    pub home: Team,
    pub away: Team,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    pub name: String,
    /// `None` before the match is decided, and for draws.
    #[serde(default)]
    pub winner: Option<bool>,
}

/// Full-time goals; both `None` until the match has been played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goals {
    #[serde(default)]
    pub home: Option<u32>,
    #[serde(default)]
    pub away: Option<u32>,
}

/// One entry of the `/fixtures/lineups` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeamLineup {
    pub team: LineupTeam,
    #[serde(default)]
    pub formation: Option<String>,
    #[serde(rename = "startXI", default)]
    pub start_xi: Vec<PlayerSlot>,
    #[serde(default)]
    pub substitutes: Vec<PlayerSlot>,
    #[serde(default)]
    pub coach: Option<Coach>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineupTeam {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerSlot {
    pub player: Player,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub pos: Option<String>,
    /// `"row:column"`, row 1 being the goalkeeper.
    #[serde(default)]
    pub grid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Coach {
    #[serde(default)]
    pub name: Option<String>,
}

/// Lineups are usually published about an hour before kickoff; until then
/// the provider returns nothing, which is a normal state rather than an
/// error.
#[derive(Debug, Clone, PartialEq)]
pub enum LineupStatus {
    Announced(BTreeMap<u64, TeamLineup>),
    NotYetAvailable,
}

impl LineupStatus {
    pub fn from_lineups(lineups: Vec<TeamLineup>) -> Self {
        let announced: BTreeMap<u64, TeamLineup> = lineups
            .into_iter()
            .filter(|lineup| !lineup.start_xi.is_empty())
            .map(|lineup| (lineup.team.id, lineup))
            .collect();

        if announced.is_empty() {
            LineupStatus::NotYetAvailable
        } else {
            LineupStatus::Announced(announced)
        }
    }

    pub fn into_team(self, team_id: u64) -> Option<TeamLineup> {
        match self {
            LineupStatus::Announced(mut lineups) => lineups.remove(&team_id),
            LineupStatus::NotYetAvailable => None,
        }
    }
}

/// Outcome of a played match from one team's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Win,
    Draw,
    Loss,
}

impl MatchResult {
    pub fn letter(self) -> char {
        match self {
            MatchResult::Win => 'W',
            MatchResult::Draw => 'D',
            MatchResult::Loss => 'L',
        }
    }
}
