use crate::error::Inconsistency;
use crate::events::{Side, parse_minute};
use crate::feed::{RawBadge, RawLineupCell, RawLineupRow};

pub const STARTERS_PER_SIDE: usize = 11;
pub const REGULATION_MINUTES: u16 = 90;
pub const MISSING_JERSEY: &str = "N/A";

const GOALKEEPER_TAG: &str = "(GK)";
const CAPTAIN_TAG: &str = "(C)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerCounters {
    pub goals: u32,
    pub penalties: u32,
    pub own_goals: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub yellow_red_cards: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub player: String,
    pub side: Side,
    pub jersey_number: String,
    pub is_starting: bool,
    pub is_goalkeeper: bool,
    pub is_captain: bool,
    pub sub_in_minute: Option<u16>,
    pub sub_out_minute: Option<u16>,
    pub card_minute: Option<u16>,
    pub counters: PlayerCounters,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    /// Home rows in source order, then away rows in source order.
    pub entries: Vec<RosterEntry>,
    pub inconsistencies: Vec<Inconsistency>,
}

impl Roster {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Inclusive on-pitch interval in match minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerWindow {
    pub start: u16,
    pub end: u16,
}

impl PlayerWindow {
    pub fn minutes(&self) -> u16 {
        self.end.saturating_sub(self.start)
    }

    pub fn contains(&self, minute: u16) -> bool {
        minute >= self.start && minute <= self.end
    }
}

pub fn match_end_minute(max_event_minute: Option<u16>) -> u16 {
    max_event_minute
        .unwrap_or(REGULATION_MINUTES)
        .max(REGULATION_MINUTES)
}

/// Accumulator threaded through the lineup rows. Starting status depends on
/// how many rows each side has produced so far.
#[derive(Debug, Default)]
struct RosterFold {
    home: Vec<RosterEntry>,
    away: Vec<RosterEntry>,
    home_rows: usize,
    away_rows: usize,
    inconsistencies: Vec<Inconsistency>,
}

impl RosterFold {
    fn row(self, row: &RawLineupRow) -> Self {
        if row.cells.iter().any(|c| matches!(c, RawLineupCell::Staff)) {
            return self;
        }
        match row.cells.as_slice() {
            [
                RawLineupCell::Digit { text },
                RawLineupCell::Player { name, badges },
            ] => self.player(Side::Home, text, name, badges),
            [
                RawLineupCell::Player { name, badges },
                RawLineupCell::Digit { text },
            ] => self.player(Side::Away, text, name, badges),
            [
                RawLineupCell::Digit { text: home_no },
                home,
                away,
                RawLineupCell::Digit { text: away_no },
            ] => {
                let next = match home {
                    RawLineupCell::Player { name, badges } => {
                        self.player(Side::Home, home_no, name, badges)
                    }
                    _ => self.skip(Side::Home),
                };
                match away {
                    RawLineupCell::Player { name, badges } => {
                        next.player(Side::Away, away_no, name, badges)
                    }
                    _ => next.skip(Side::Away),
                }
            }
            _ => self,
        }
    }

    // A row without a usable name still occupies a lineup slot.
    fn skip(mut self, side: Side) -> Self {
        match side {
            Side::Home => self.home_rows += 1,
            Side::Away => self.away_rows += 1,
        }
        self
    }

    fn player(mut self, side: Side, jersey: &str, name: &str, badges: &[RawBadge]) -> Self {
        let seen = match side {
            Side::Home => self.home_rows,
            Side::Away => self.away_rows,
        };
        let is_starting = seen < STARTERS_PER_SIDE;
        if let Some(entry) = parse_player_cell(
            side,
            jersey,
            name,
            badges,
            is_starting,
            &mut self.inconsistencies,
        ) {
            match side {
                Side::Home => self.home.push(entry),
                Side::Away => self.away.push(entry),
            }
        }
        self.skip(side)
    }

    fn finish(self) -> Roster {
        let mut entries = self.home;
        entries.extend(self.away);
        Roster {
            entries,
            inconsistencies: self.inconsistencies,
        }
    }
}

pub fn parse_roster(rows: &[RawLineupRow]) -> Roster {
    rows.iter()
        .fold(RosterFold::default(), |acc, row| acc.row(row))
        .finish()
}

fn parse_player_cell(
    side: Side,
    jersey: &str,
    raw_name: &str,
    badges: &[RawBadge],
    is_starting: bool,
    issues: &mut Vec<Inconsistency>,
) -> Option<RosterEntry> {
    let raw_name = raw_name.trim();
    if raw_name.is_empty() {
        return None;
    }
    let is_goalkeeper = raw_name.contains(GOALKEEPER_TAG);
    let is_captain = raw_name.contains(CAPTAIN_TAG);
    let player = raw_name
        .replace(GOALKEEPER_TAG, "")
        .replace(CAPTAIN_TAG, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let mut counters = PlayerCounters::default();
    let mut sub_in_minute = None;
    let mut sub_out_minute = None;
    let mut red_minute = None;
    let mut yellow_red_minute = None;

    for badge in badges {
        let minute = parse_minute(&badge.text);
        match badge.marker.trim().to_ascii_lowercase().as_str() {
            "in" => sub_in_minute = sub_in_minute.or(minute),
            "out" => sub_out_minute = sub_out_minute.or(minute),
            "goal" => counters.goals += 1,
            "penalty" => counters.penalties += 1,
            "owngoal" => counters.own_goals += 1,
            "yellow" => counters.yellow_cards += 1,
            "red" => {
                counters.red_cards += 1;
                red_minute = red_minute.or(minute);
            }
            "yellowred" => {
                counters.yellow_red_cards += 1;
                yellow_red_minute = yellow_red_minute.or(minute);
            }
            _ => {}
        }
    }

    if let (Some(yellow_red), Some(red)) = (yellow_red_minute, red_minute) {
        issues.push(Inconsistency::YellowRedAndRed {
            player: player.clone(),
            yellow_red,
            red,
        });
    }

    let jersey = jersey.trim();
    Some(RosterEntry {
        player,
        side,
        jersey_number: if jersey.is_empty() {
            MISSING_JERSEY.to_string()
        } else {
            jersey.to_string()
        },
        is_starting,
        is_goalkeeper,
        is_captain,
        sub_in_minute,
        sub_out_minute,
        card_minute: yellow_red_minute.or(red_minute),
        counters,
    })
}

/// On-pitch window for one roster entry, or None if the player never came on.
/// A starter with both a sub-out and a card leaves at the earlier of the two;
/// a substitute leaves at the sub-out. Either conflict is reported in `issues`.
pub fn resolve_window(
    entry: &RosterEntry,
    match_end: u16,
    issues: &mut Vec<Inconsistency>,
) -> Option<PlayerWindow> {
    let start = if entry.is_starting {
        0
    } else {
        entry.sub_in_minute?
    };

    let exit = match (entry.sub_out_minute, entry.card_minute) {
        (Some(sub_out), Some(card)) => {
            issues.push(Inconsistency::SubOutAndCard {
                player: entry.player.clone(),
                sub_out,
                card,
            });
            if entry.is_starting {
                Some(sub_out.min(card))
            } else {
                Some(sub_out)
            }
        }
        (sub_out, card) => sub_out.or(card),
    };

    let mut end = exit.unwrap_or(match_end);
    if end > match_end {
        issues.push(Inconsistency::WindowPastMatchEnd {
            player: entry.player.clone(),
            end,
            match_end,
        });
        end = match_end;
    }
    let start = start.min(match_end);
    if end < start {
        issues.push(Inconsistency::WindowInverted {
            player: entry.player.clone(),
            start,
            end,
        });
        end = start;
    }

    Some(PlayerWindow { start, end })
}
