use crate::attribution::{GoalTally, PlayerPerformance};
use crate::record::HarvestedMatch;
use crate::score::running_scores;

/// Column layout of one append-only store. Column order is part of the file
/// format: the ledger finds matches again through `key_column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSchema {
    pub name: &'static str,
    pub key_column: &'static str,
    pub columns: &'static [&'static str],
}

pub const EVENTS_SCHEMA: StoreSchema = StoreSchema {
    name: "match_events",
    key_column: "matchurl",
    columns: &[
        "matchurl",
        "home_team",
        "away_team",
        "event",
        "player_name",
        "team",
        "minute",
        "is_home",
        "home_team_goals",
        "away_team_goals",
        "team_against",
        "goal_new_diff",
    ],
};

pub const PLAYERS_SCHEMA: StoreSchema = StoreSchema {
    name: "player_matchdata",
    key_column: "Match URL",
    columns: &[
        "Match URL",
        "Home Team",
        "Away Team",
        "Player Name",
        "Jersey Number",
        "Team",
        "Is Goalkeeper",
        "Is Captain",
        "Clean Sheet",
        "Match Result",
        "Starting Player",
        "Substituted In",
        "Substitution Minute (In)",
        "Substituted Out",
        "Substitution Minute (Out)",
        "Minutes Played",
        "Goals Scored",
        "Penalties Scored",
        "Own Goals Scored",
        "Yellow Cards",
        "Red Cards",
        "YellowRed Cards",
        "Card Minute",
        "Result P",
        "GoalDiff",
        "GoalFor",
        "GoalAgainst",
        "Result without P",
        "GoalDiff without P",
        "GoalWoFor",
        "GoalWoAgainst",
    ],
};

/// One row per normalized event, with the running score after it.
pub fn event_rows(m: &HarvestedMatch) -> Vec<Vec<String>> {
    let record = &m.record;
    let scores = running_scores(&record.events);
    record
        .events
        .iter()
        .zip(scores)
        .map(|(event, score)| {
            let goal_new_diff = event.kind.is_scoring().then(|| {
                i64::from(score.for_side(event.side)) - i64::from(score.against_side(event.side))
            });
            vec![
                record.match_id.clone(),
                record.home_team.clone(),
                record.away_team.clone(),
                event.kind.label().to_string(),
                event.player.clone().unwrap_or_default(),
                record.team(event.side).to_string(),
                event.minute.to_string(),
                if event.side.is_home() { "1" } else { "0" }.to_string(),
                score.home.to_string(),
                score.away.to_string(),
                record.team(event.side.opponent()).to_string(),
                opt(goal_new_diff),
            ]
        })
        .collect()
}

/// One row per roster entry, home rows first.
pub fn player_rows(m: &HarvestedMatch) -> Vec<Vec<String>> {
    m.players.iter().map(|p| player_row(m, p)).collect()
}

fn player_row(m: &HarvestedMatch, p: &PlayerPerformance) -> Vec<String> {
    let record = &m.record;
    let entry = &p.entry;
    let inside = p.attribution.in_window;
    let outside = p.attribution.outside_window;
    vec![
        record.match_id.clone(),
        record.home_team.clone(),
        record.away_team.clone(),
        entry.player.clone(),
        entry.jersey_number.clone(),
        record.team(entry.side).to_string(),
        entry.is_goalkeeper.to_string(),
        entry.is_captain.to_string(),
        p.clean_sheet.to_string(),
        p.match_result.label().to_string(),
        entry.is_starting.to_string(),
        entry.sub_in_minute.is_some().to_string(),
        opt(entry.sub_in_minute),
        entry.sub_out_minute.is_some().to_string(),
        opt(entry.sub_out_minute),
        p.attribution.minutes_played.to_string(),
        entry.counters.goals.to_string(),
        entry.counters.penalties.to_string(),
        entry.counters.own_goals.to_string(),
        entry.counters.yellow_cards.to_string(),
        entry.counters.red_cards.to_string(),
        entry.counters.yellow_red_cards.to_string(),
        opt(entry.card_minute),
        opt(inside.map(points)),
        opt(inside.map(|t| t.diff())),
        opt(inside.map(|t| t.goals_for)),
        opt(inside.map(|t| t.goals_against)),
        opt(outside.map(points)),
        opt(outside.map(|t| t.diff())),
        opt(outside.map(|t| t.goals_for)),
        opt(outside.map(|t| t.goals_against)),
    ]
}

fn points(tally: GoalTally) -> f64 {
    tally.outcome().points()
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
