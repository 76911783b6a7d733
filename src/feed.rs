use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::HarvestError;

pub const DEFAULT_HOME_TEAM: &str = "Home Team";
pub const DEFAULT_AWAY_TEAM: &str = "Away Team";

/// Source of calendars and per-match feeds. Implementations own all
/// side-effecting retrieval; everything downstream is pure.
pub trait FeedAdapter {
    fn fetch_calendar(&mut self) -> Result<Vec<CalendarEntry>, HarvestError>;

    fn fetch_match(&mut self, match_key: &str) -> Result<RawMatchFeed, HarvestError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEntry {
    #[serde(alias = "url", rename = "matchKey")]
    pub match_key: String,
    #[serde(default)]
    pub date: String,
    #[serde(rename = "homeTeam")]
    pub home_team: String,
    #[serde(rename = "homeScore", default, deserialize_with = "score_opt")]
    pub home_score: Option<u32>,
    #[serde(rename = "awayTeam")]
    pub away_team: String,
    #[serde(rename = "awayScore", default, deserialize_with = "score_opt")]
    pub away_score: Option<u32>,
}

impl CalendarEntry {
    /// Only matches with a final score are worth harvesting in detail.
    pub fn final_score(&self) -> Option<(u32, u32)> {
        Some((self.home_score?, self.away_score?))
    }

    /// The match key as written to the stores and compared against them.
    pub fn key(&self) -> &str {
        self.match_key.trim()
    }

    pub fn is_eligible(&self) -> bool {
        !self.key().is_empty() && self.final_score().is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMatchFeed {
    #[serde(rename = "matchKey", default)]
    pub match_key: String,
    #[serde(rename = "homeTeam", default)]
    pub home_team: Option<String>,
    #[serde(rename = "awayTeam", default)]
    pub away_team: Option<String>,
    #[serde(rename = "scoreText", default)]
    pub score_text: Option<String>,
    #[serde(default)]
    pub timeline: Vec<RawTimelineItem>,
    #[serde(default)]
    pub lineup: Vec<RawLineupRow>,
}

impl RawMatchFeed {
    pub fn home_team(&self) -> &str {
        self.home_team
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_HOME_TEAM)
    }

    pub fn away_team(&self) -> &str {
        self.away_team
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_AWAY_TEAM)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTimelineItem {
    #[serde(default)]
    pub markers: Vec<String>,
    #[serde(rename = "minuteText", default)]
    pub minute_text: Option<String>,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    pub panel: Panel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLineupRow {
    #[serde(default)]
    pub cells: Vec<RawLineupCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawLineupCell {
    Digit {
        #[serde(default)]
        text: String,
    },
    Player {
        #[serde(default)]
        name: String,
        #[serde(default)]
        badges: Vec<RawBadge>,
    },
    Staff,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBadge {
    pub marker: String,
    #[serde(default)]
    pub text: String,
}

pub fn parse_match_feed_json(raw: &str) -> Result<RawMatchFeed> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(RawMatchFeed::default());
    }
    serde_json::from_str(trimmed).context("invalid match feed json")
}

pub fn parse_calendar_json(raw: &str) -> Result<Vec<CalendarEntry>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).context("invalid calendar json")
}

/// Parses a header score like "2 - 1" or "FT 0:0".
pub fn parse_score_pair(raw: &str) -> Option<(u32, u32)> {
    let mut nums = raw
        .split(|ch: char| !ch.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u32>().ok());
    let home = nums.next()?;
    let away = nums.next()?;
    Some((home, away))
}

fn score_opt<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(as_u32_any))
}

fn as_u32_any(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    v.as_str()?.trim().parse::<u32>().ok()
}
