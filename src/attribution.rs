use serde::{Deserialize, Serialize};

use crate::error::Inconsistency;
use crate::events::{Event, Side};
use crate::lineup::{PlayerWindow, Roster, RosterEntry, resolve_window};
use crate::score::{Score, tally, tally_in_range, tally_outside_range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn from_goals(goals_for: u32, goals_against: u32) -> Self {
        if goals_for > goals_against {
            Outcome::Win
        } else if goals_for < goals_against {
            Outcome::Loss
        } else {
            Outcome::Draw
        }
    }

    pub fn points(self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Loss => 0.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Win => "Win",
            Outcome::Draw => "Draw",
            Outcome::Loss => "Loss",
        }
    }
}

/// Goals for and against, from one side's perspective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoalTally {
    pub goals_for: u32,
    pub goals_against: u32,
}

impl GoalTally {
    pub fn from_score(score: Score, side: Side) -> Self {
        Self {
            goals_for: score.for_side(side),
            goals_against: score.against_side(side),
        }
    }

    pub fn diff(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from_goals(self.goals_for, self.goals_against)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributionResult {
    pub window: Option<PlayerWindow>,
    pub minutes_played: u16,
    /// None when the player never came on.
    pub in_window: Option<GoalTally>,
    /// None when the player covered the whole match: there is no "without" sample.
    pub outside_window: Option<GoalTally>,
}

impl AttributionResult {
    pub fn result_in_window(&self) -> Option<Outcome> {
        self.in_window.map(|t| t.outcome())
    }

    pub fn result_outside_window(&self) -> Option<Outcome> {
        self.outside_window.map(|t| t.outcome())
    }
}

pub fn attribute(
    window: Option<PlayerWindow>,
    side: Side,
    events: &[Event],
    match_end: u16,
) -> AttributionResult {
    let Some(window) = window else {
        // Never on the pitch: everything happened without them.
        return AttributionResult {
            window: None,
            minutes_played: 0,
            in_window: None,
            outside_window: Some(GoalTally::from_score(tally(events), side)),
        };
    };

    let minutes_played = window.minutes();
    let in_window = GoalTally::from_score(tally_in_range(events, window.start, window.end), side);
    let outside_window = (minutes_played < match_end).then(|| {
        GoalTally::from_score(tally_outside_range(events, window.start, window.end), side)
    });

    AttributionResult {
        window: Some(window),
        minutes_played,
        in_window: Some(in_window),
        outside_window,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerPerformance {
    pub entry: RosterEntry,
    pub attribution: AttributionResult,
    pub clean_sheet: bool,
    pub match_result: Outcome,
}

pub fn attribute_roster(
    roster: &Roster,
    events: &[Event],
    final_score: Score,
    match_end: u16,
    issues: &mut Vec<Inconsistency>,
) -> Vec<PlayerPerformance> {
    roster
        .entries
        .iter()
        .map(|entry| {
            let window = resolve_window(entry, match_end, issues);
            let attribution = attribute(window, entry.side, events, match_end);
            let whole_match = GoalTally::from_score(final_score, entry.side);
            PlayerPerformance {
                entry: entry.clone(),
                attribution,
                clean_sheet: entry.is_goalkeeper
                    && attribution.minutes_played > 0
                    && whole_match.goals_against == 0,
                match_result: whole_match.outcome(),
            }
        })
        .collect()
}
