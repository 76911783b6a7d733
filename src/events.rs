use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::feed::{Panel, RawTimelineItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    pub fn from_panel(panel: Panel) -> Side {
        match panel {
            Panel::Left => Side::Home,
            Panel::Right => Side::Away,
        }
    }

    pub fn is_home(self) -> bool {
        self == Side::Home
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Goal,
    Penalty,
    OwnGoal,
    YellowCard,
    RedCard,
    YellowRed,
    SubIn,
    SubOut,
}

// First matching marker wins; the order is fixed so classification is deterministic
// even if a fragment carries more than one marker.
const KIND_PRECEDENCE: [(&str, EventKind); 8] = [
    ("goal", EventKind::Goal),
    ("penalty", EventKind::Penalty),
    ("yellow", EventKind::YellowCard),
    ("red", EventKind::RedCard),
    ("yellowred", EventKind::YellowRed),
    ("in", EventKind::SubIn),
    ("out", EventKind::SubOut),
    ("owngoal", EventKind::OwnGoal),
];

impl EventKind {
    pub fn from_markers<S: AsRef<str>>(markers: &[S]) -> Option<EventKind> {
        let normalized = markers
            .iter()
            .map(|m| m.as_ref().trim().to_ascii_lowercase())
            .collect::<Vec<_>>();
        KIND_PRECEDENCE
            .iter()
            .find(|(marker, _)| normalized.iter().any(|m| m == marker))
            .map(|(_, kind)| *kind)
    }

    pub fn is_scoring(self) -> bool {
        matches!(
            self,
            EventKind::Goal | EventKind::Penalty | EventKind::OwnGoal
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            EventKind::Goal => "Goal",
            EventKind::Penalty => "Penalty",
            EventKind::OwnGoal => "Own Goal",
            EventKind::YellowCard => "Yellow Card",
            EventKind::RedCard => "Red Card",
            EventKind::YellowRed => "Yellow-Red Card",
            EventKind::SubIn => "Substitute In",
            EventKind::SubOut => "Substitute Out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub minute: u16,
    pub kind: EventKind,
    /// For own goals this is the side whose tally benefits.
    pub side: Side,
    pub player: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedTimeline {
    pub events: Vec<Event>,
    /// Events whose minute badge could not be read and fell back to 0.
    pub low_confidence: usize,
    /// Fragments carrying no known category marker.
    pub dropped: usize,
}

impl NormalizedTimeline {
    pub fn max_minute(&self) -> Option<u16> {
        self.events.iter().map(|e| e.minute).max()
    }
}

/// Reads a minute badge such as "67'", "90+3" or "‘12". Stoppage time is
/// folded into the base minute. Returns None when no digits are present.
pub fn parse_minute(text: &str) -> Option<u16> {
    let digits = text
        .trim()
        .chars()
        .skip_while(|ch| !ch.is_ascii_digit())
        .take_while(|ch| ch.is_ascii_digit())
        .collect::<String>();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u16>().ok()
}

pub fn player_name(first: Option<&str>, last: Option<&str>) -> String {
    let first = first.map(str::trim).unwrap_or_default();
    let last = last.map(str::trim).unwrap_or_default();
    format!("{first} {last}").trim().to_string()
}

pub fn normalize_timeline(items: &[RawTimelineItem]) -> NormalizedTimeline {
    let mut out = NormalizedTimeline::default();

    for (idx, item) in items.iter().enumerate() {
        let Some(kind) = EventKind::from_markers(&item.markers) else {
            out.dropped += 1;
            continue;
        };
        let minute = match item.minute_text.as_deref().and_then(parse_minute) {
            Some(minute) => minute,
            None => {
                debug!(
                    item = idx,
                    badge = item.minute_text.as_deref().unwrap_or(""),
                    "unreadable minute badge, using 0"
                );
                out.low_confidence += 1;
                0
            }
        };
        let name = player_name(item.first_name.as_deref(), item.last_name.as_deref());
        out.events.push(Event {
            minute,
            kind,
            side: Side::from_panel(item.panel),
            player: if name.is_empty() { None } else { Some(name) },
        });
    }

    // sort_by_key is stable, so equal minutes keep source order.
    out.events.sort_by_key(|e| e.minute);
    out
}
