//! Markdown rendering of fixtures, form tables and lineups.

use std::collections::BTreeMap;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::types::{Fixture, MatchResult, PlayerSlot, TeamLineup};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day], [year]");
const SHORT_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

fn format_with(dt: OffsetDateTime, format: &[BorrowedFormatItem<'_>]) -> String {
    dt.to_offset(UtcOffset::UTC)
        .format(format)
        .unwrap_or_else(|_| dt.date().to_string())
}

/// `Oct 19, 2026`
pub fn format_date(dt: OffsetDateTime) -> String {
    format_with(dt, DATE_FORMAT)
}

impl Fixture {
    pub fn id(&self) -> u64 {
        self.fixture.id
    }

    pub fn kickoff(&self) -> OffsetDateTime {
        self.fixture.date
    }

    /// Result for `team_id`, or `None` if the match has no final score yet
    /// or the team did not play in it.
    pub fn result_for(&self, team_id: u64) -> Option<MatchResult> {
        self.goals.home?;
        self.goals.away?;
        let team = if self.teams.home.id == team_id {
            &self.teams.home
        } else if self.teams.away.id == team_id {
            &self.teams.away
        } else {
            return None;
        };
        Some(match team.winner {
            Some(true) => MatchResult::Win,
            Some(false) => MatchResult::Loss,
            None => MatchResult::Draw,
        })
    }

    pub fn format_title(&self) -> String {
        format!(
            "[Match Thread] {} vs {} | {} {} | {}",
            self.teams.home.name,
            self.teams.away.name,
            self.league.name,
            self.league.round,
            format_date(self.kickoff()),
        )
    }

    /// Post body without any signature. Form and lineup blocks are
    /// included only when given.
    pub fn format_body(
        &self,
        home_form: Option<&str>,
        away_form: Option<&str>,
        lineup: Option<&str>,
    ) -> String {
        let mut paragraphs = vec![format!("*** {} {} ***", self.league.name, self.league.round)];

        if let Some(referee) = self.fixture.referee.as_deref() {
            paragraphs.push(format!("Referee: {referee}"));
        }

        let ground: Vec<&str> = [
            self.fixture.venue.name.as_deref(),
            self.fixture.venue.city.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !ground.is_empty() {
            paragraphs.push(format!("Ground: {}", ground.join(", ")));
        }

        paragraphs.push(format!("Date: {}", format_date(self.kickoff())));
        paragraphs.push(format!(
            "Kickoff time: {} UTC",
            format_with(self.kickoff(), TIME_FORMAT)
        ));

        paragraphs.extend(
            [home_form, away_form, lineup]
                .into_iter()
                .flatten()
                .map(str::to_owned),
        );

        paragraphs.join("\n\n")
    }
}

/// Recent form of `team_id` as a collapsible block, oldest match first.
///
/// Matches without a final score or not involving the team are skipped. The
/// input order does not matter: entries are sorted by kickoff.
pub fn format_form(team_name: &str, team_id: u64, fixtures: &[Fixture]) -> String {
    let mut played: Vec<(&Fixture, MatchResult)> = fixtures
        .iter()
        .filter_map(|fixture| fixture.result_for(team_id).map(|res| (fixture, res)))
        .collect();
    played.sort_by_key(|(fixture, _)| fixture.kickoff());

    let summary: String = played.iter().map(|(_, res)| res.letter()).collect();
    let mut out = if summary.is_empty() {
        format!("::: spoiler {team_name} form\n")
    } else {
        format!("::: spoiler {team_name} form: {summary}\n")
    };

    for (fixture, res) in played {
        let (home, away) = (
            fixture.goals.home.unwrap_or_default(),
            fixture.goals.away.unwrap_or_default(),
        );
        let (scored, conceded, opponent, venue) = if fixture.teams.home.id == team_id {
            (home, away, &fixture.teams.away.name, "H")
        } else {
            (away, home, &fixture.teams.home.name, "A")
        };
        out.push_str(&format!(
            "- {} {scored}-{conceded} vs {opponent} ({venue}), {}\n",
            res.letter(),
            format_with(fixture.kickoff(), SHORT_DATE_FORMAT),
        ));
    }

    out.push_str(":::");
    out
}

impl TeamLineup {
    pub fn format_lineup(&self) -> String {
        let mut paragraphs = vec![match self.formation.as_deref() {
            Some(formation) => format!("**{} lineup** ({formation})", self.team.name),
            None => format!("**{} lineup**", self.team.name),
        }];

        paragraphs.extend(starting_rows(&self.start_xi));

        if !self.substitutes.is_empty() {
            let subs: Vec<&str> = self
                .substitutes
                .iter()
                .map(|slot| slot.player.name.as_str())
                .collect();
            paragraphs.push(format!("Subs: {}", subs.join(", ")));
        }

        if let Some(coach) = self.coach.as_ref().and_then(|c| c.name.as_deref()) {
            paragraphs.push(format!("Manager: {coach}"));
        }

        paragraphs.join("\n\n")
    }
}

fn grid_position(slot: &PlayerSlot) -> Option<(u32, u32)> {
    let (row, col) = slot.player.grid.as_deref()?.split_once(':')?;
    Some((row.trim().parse().ok()?, col.trim().parse().ok()?))
}

/// Starting XI rendered one formation line per paragraph, goalkeeper first.
/// Players without a usable grid position go on a final line in the
/// provider's order.
fn starting_rows(start_xi: &[PlayerSlot]) -> Vec<String> {
    let mut rows: BTreeMap<u32, Vec<(u32, &str)>> = BTreeMap::new();
    let mut unplaced = vec![];

    for slot in start_xi {
        match grid_position(slot) {
            Some((row, col)) => rows
                .entry(row)
                .or_default()
                .push((col, slot.player.name.as_str())),
            None => unplaced.push(slot.player.name.as_str()),
        }
    }

    let mut lines: Vec<String> = rows
        .into_values()
        .map(|mut row| {
            row.sort_by_key(|(col, _)| *col);
            row.into_iter()
                .map(|(_, name)| name)
                .collect::<Vec<_>>()
                .join(" - ")
        })
        .collect();

    if !unplaced.is_empty() {
        lines.push(unplaced.join(", "));
    }
    lines
}
