use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::HarvestError;
use crate::feed::{
    CalendarEntry, FeedAdapter, Panel, RawBadge, RawLineupCell, RawLineupRow, RawMatchFeed,
    RawTimelineItem, parse_score_pair,
};

const FIRST_NAMES: &[&str] = &[
    "Luuk", "Daan", "Sem", "Milan", "Jesse", "Noah", "Thijs", "Bram", "Ruben", "Stijn", "Lars",
    "Timo", "Joey", "Kevin", "Mats", "Niels",
];
const LAST_NAMES: &[&str] = &[
    "de Jong", "Bakker", "Visser", "Smit", "Meijer", "Mulder", "de Boer", "Bos", "Vos", "Peters",
    "Hendriks", "Dekker", "Brouwer", "Kok", "Jacobs", "Vermeulen",
];
const SUBS_PER_SIDE: usize = 3;
const BENCH_PER_SIDE: usize = 5;

/// Scripted in-memory adapter. Records every match fetch in call order.
#[derive(Debug, Default, Clone)]
pub struct FakeFeed {
    calendar: Option<Vec<CalendarEntry>>,
    feeds: HashMap<String, RawMatchFeed>,
    failing: HashSet<String>,
    fetched: Vec<String>,
}

impl FakeFeed {
    pub fn new(calendar: Vec<CalendarEntry>) -> Self {
        Self {
            calendar: Some(calendar),
            ..Self::default()
        }
    }

    /// Adapter whose calendar fetch always fails.
    pub fn without_calendar() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, feed: RawMatchFeed) -> Self {
        self.feeds.insert(feed.match_key.trim().to_string(), feed);
        self
    }

    pub fn with_failure(mut self, match_key: &str) -> Self {
        self.failing.insert(match_key.trim().to_string());
        self
    }

    pub fn set_calendar(&mut self, calendar: Vec<CalendarEntry>) {
        self.calendar = Some(calendar);
    }

    pub fn fetched(&self) -> &[String] {
        &self.fetched
    }

    pub fn clear_fetched(&mut self) {
        self.fetched.clear();
    }
}

impl FeedAdapter for FakeFeed {
    fn fetch_calendar(&mut self) -> Result<Vec<CalendarEntry>, HarvestError> {
        self.calendar
            .clone()
            .ok_or_else(|| HarvestError::CandidatesUnavailable(anyhow!("calendar not scripted")))
    }

    fn fetch_match(&mut self, match_key: &str) -> Result<RawMatchFeed, HarvestError> {
        let match_key = match_key.trim();
        self.fetched.push(match_key.to_string());
        if self.failing.contains(match_key) {
            return Err(HarvestError::fetch(match_key, anyhow!("scripted timeout")));
        }
        self.feeds
            .get(match_key)
            .cloned()
            .ok_or_else(|| HarvestError::fetch(match_key, anyhow!("no feed scripted")))
    }
}

/// Calendar row matching a feed's header score. Unscored if the header is unreadable.
pub fn calendar_entry_for(feed: &RawMatchFeed) -> CalendarEntry {
    let score = feed.score_text.as_deref().and_then(parse_score_pair);
    CalendarEntry {
        match_key: feed.match_key.clone(),
        date: String::new(),
        home_team: feed.home_team().to_string(),
        home_score: score.map(|s| s.0),
        away_team: feed.away_team().to_string(),
        away_score: score.map(|s| s.1),
    }
}

struct SyntheticPlayer {
    jersey: u8,
    name: String,
    badges: Vec<RawBadge>,
}

/// Random but internally consistent match: the header score equals the
/// tally of scoring timeline items, and every substitution appears both in
/// the timeline and on the lineup badges.
pub fn synthetic_feed<R: Rng + ?Sized>(rng: &mut R, match_key: &str) -> RawMatchFeed {
    let mut timeline = Vec::new();
    let home = synthetic_side(rng, Panel::Left, &mut timeline);
    let away = synthetic_side(rng, Panel::Right, &mut timeline);
    timeline.shuffle(rng);

    let score = |panel: Panel| {
        timeline
            .iter()
            .filter(|item| item.panel == panel)
            .filter(|item| {
                item.markers
                    .iter()
                    .any(|m| matches!(m.as_str(), "goal" | "penalty" | "owngoal"))
            })
            .count()
    };
    let score_text = format!("{} - {}", score(Panel::Left), score(Panel::Right));

    let mut lineup = Vec::with_capacity(home.len() + 1);
    for (h, a) in home.into_iter().zip(away) {
        lineup.push(RawLineupRow {
            cells: vec![
                RawLineupCell::Digit {
                    text: h.jersey.to_string(),
                },
                RawLineupCell::Player {
                    name: h.name,
                    badges: h.badges,
                },
                RawLineupCell::Player {
                    name: a.name,
                    badges: a.badges,
                },
                RawLineupCell::Digit {
                    text: a.jersey.to_string(),
                },
            ],
        });
    }
    lineup.push(RawLineupRow {
        cells: vec![RawLineupCell::Staff, RawLineupCell::Staff],
    });

    RawMatchFeed {
        match_key: match_key.to_string(),
        home_team: Some(format!("{} FC", pick(rng, LAST_NAMES))),
        away_team: Some(format!("{} United", pick(rng, LAST_NAMES))),
        score_text: Some(score_text),
        timeline,
        lineup,
    }
}

fn synthetic_side<R: Rng + ?Sized>(
    rng: &mut R,
    panel: Panel,
    timeline: &mut Vec<RawTimelineItem>,
) -> Vec<SyntheticPlayer> {
    let mut squad = synthetic_squad(rng);
    synthetic_subs(rng, panel, &mut squad, timeline);
    synthetic_goals(rng, panel, &mut squad[..11], timeline);
    squad
}

fn synthetic_squad<R: Rng + ?Sized>(rng: &mut R) -> Vec<SyntheticPlayer> {
    (0..11 + BENCH_PER_SIDE)
        .map(|idx| {
            let mut name = format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES));
            if idx == 0 {
                name.push_str(" (GK)");
            } else if idx == 1 {
                name.push_str(" (C)");
            }
            SyntheticPlayer {
                jersey: idx as u8 + 1,
                name,
                badges: Vec::new(),
            }
        })
        .collect()
}

fn synthetic_subs<R: Rng + ?Sized>(
    rng: &mut R,
    panel: Panel,
    squad: &mut [SyntheticPlayer],
    timeline: &mut Vec<RawTimelineItem>,
) {
    let count = rng.gen_range(0..=SUBS_PER_SIDE);
    let mut outfield = (1..11).collect::<Vec<_>>();
    outfield.shuffle(rng);
    for (slot, &starter) in outfield.iter().take(count).enumerate() {
        let minute = rng.gen_range(46..=85u16).to_string();
        let sub = 11 + slot;
        squad[starter].badges.push(badge("out", &minute));
        squad[sub].badges.push(badge("in", &minute));
        timeline.push(item("out", &minute, &squad[starter].name, panel));
        timeline.push(item("in", &minute, &squad[sub].name, panel));
    }
}

fn synthetic_goals<R: Rng + ?Sized>(
    rng: &mut R,
    panel: Panel,
    scorers: &mut [SyntheticPlayer],
    timeline: &mut Vec<RawTimelineItem>,
) {
    let goals = rng.gen_range(0..=4);
    for _ in 0..goals {
        let minute = rng.gen_range(1..=90u16).to_string();
        let marker = match rng.gen_range(0..10) {
            0 => "penalty",
            1 => "owngoal",
            _ => "goal",
        };
        let idx = rng.gen_range(0..scorers.len());
        scorers[idx].badges.push(badge(marker, &minute));
        timeline.push(item(marker, &minute, &scorers[idx].name, panel));
        if rng.gen_bool(0.3) {
            let minute = rng.gen_range(1..=90u16).to_string();
            timeline.push(item("yellow", &minute, &scorers[idx].name, panel));
            scorers[idx].badges.push(badge("yellow", &minute));
        }
    }
}

fn badge(marker: &str, minute: &str) -> RawBadge {
    RawBadge {
        marker: marker.to_string(),
        text: format!("{minute}'"),
    }
}

fn item(marker: &str, minute: &str, name: &str, panel: Panel) -> RawTimelineItem {
    let clean = name.replace(" (GK)", "").replace(" (C)", "");
    let (first, last) = clean.split_once(' ').unwrap_or((clean.as_str(), ""));
    RawTimelineItem {
        markers: vec![marker.to_string()],
        minute_text: Some(format!("{minute}'")),
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        panel,
    }
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, pool: &[&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or("Player")
}
