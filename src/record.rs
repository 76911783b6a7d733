use crate::attribution::{PlayerPerformance, attribute_roster};
use crate::error::{HarvestError, Inconsistency};
use crate::events::{Event, Side, normalize_timeline};
use crate::feed::{
    CalendarEntry, DEFAULT_AWAY_TEAM, DEFAULT_HOME_TEAM, RawMatchFeed, parse_score_pair,
};
use crate::lineup::{match_end_minute, parse_roster};
use crate::score::{Score, Trajectory, tally};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub final_home_score: u32,
    pub final_away_score: u32,
    pub events: Vec<Event>,
}

impl MatchRecord {
    pub fn final_score(&self) -> Score {
        Score::new(self.final_home_score, self.final_away_score)
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    /// Compares the scoring events against the recorded final score.
    pub fn score_mismatch(&self) -> Option<Inconsistency> {
        let counted = tally(&self.events);
        if counted == self.final_score() {
            return None;
        }
        Some(Inconsistency::ScoreMismatch {
            home_events: counted.home,
            away_events: counted.away,
            home_final: self.final_home_score,
            away_final: self.final_away_score,
        })
    }
}

/// Everything derived from one match feed, held in memory until it is written.
#[derive(Debug, Clone)]
pub struct HarvestedMatch {
    pub record: MatchRecord,
    pub trajectory: Trajectory,
    pub players: Vec<PlayerPerformance>,
    pub match_end: u16,
    pub low_confidence_minutes: usize,
    pub inconsistencies: Vec<Inconsistency>,
}

impl HarvestedMatch {
    pub fn has_roster(&self) -> bool {
        !self.players.is_empty()
    }
}

pub fn build_match(
    key: &str,
    feed: &RawMatchFeed,
    calendar: Option<&CalendarEntry>,
) -> Result<HarvestedMatch, HarvestError> {
    let timeline = normalize_timeline(&feed.timeline);
    let roster = parse_roster(&feed.lineup);
    if timeline.events.is_empty() && roster.is_empty() {
        return Err(HarvestError::extraction(key, "feed has no timeline and no lineup"));
    }

    let mut inconsistencies = roster.inconsistencies.clone();
    let final_score = resolve_final_score(feed, calendar, &timeline.events, &mut inconsistencies);
    let match_end = match_end_minute(timeline.max_minute());

    let record = MatchRecord {
        match_id: key.to_string(),
        home_team: team_name(feed.home_team.as_deref(), calendar.map(|c| c.home_team.as_str()))
            .unwrap_or(DEFAULT_HOME_TEAM)
            .to_string(),
        away_team: team_name(feed.away_team.as_deref(), calendar.map(|c| c.away_team.as_str()))
            .unwrap_or(DEFAULT_AWAY_TEAM)
            .to_string(),
        final_home_score: final_score.home,
        final_away_score: final_score.away,
        events: timeline.events,
    };
    if let Some(mismatch) = record.score_mismatch() {
        inconsistencies.push(mismatch);
    }

    let players = attribute_roster(
        &roster,
        &record.events,
        final_score,
        match_end,
        &mut inconsistencies,
    );

    Ok(HarvestedMatch {
        trajectory: Trajectory::replay(&record.events),
        record,
        players,
        match_end,
        low_confidence_minutes: timeline.low_confidence,
        inconsistencies,
    })
}

fn team_name<'a>(from_feed: Option<&'a str>, from_calendar: Option<&'a str>) -> Option<&'a str> {
    [from_feed, from_calendar]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
}

// Header score first, calendar second, replayed timeline last.
fn resolve_final_score(
    feed: &RawMatchFeed,
    calendar: Option<&CalendarEntry>,
    events: &[Event],
    issues: &mut Vec<Inconsistency>,
) -> Score {
    let header = feed.score_text.as_deref().and_then(parse_score_pair);
    let listed = calendar.and_then(CalendarEntry::final_score);
    match (header, listed) {
        (Some(header), Some(listed)) => {
            if header != listed {
                issues.push(Inconsistency::HeaderScoreDiffers {
                    header,
                    calendar: listed,
                });
            }
            Score::new(header.0, header.1)
        }
        (Some((home, away)), None) | (None, Some((home, away))) => Score::new(home, away),
        (None, None) => tally(events),
    }
}
