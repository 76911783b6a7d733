use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use reqwest::blocking::Client;
use tracing::debug;

use crate::config::{FeedLocation, HarvestConfig};
use crate::error::HarvestError;
use crate::feed::{
    CalendarEntry, FeedAdapter, RawMatchFeed, parse_calendar_json, parse_match_feed_json,
};
use crate::http_client::{get_text, http_client};

/// Feeds previously extracted to disk: a calendar file plus one
/// `<sanitized key>.json` per match.
#[derive(Debug, Clone)]
pub struct DirFeedSource {
    dir: PathBuf,
    calendar: PathBuf,
}

impl DirFeedSource {
    pub fn new(dir: impl Into<PathBuf>, calendar: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            calendar: calendar.into(),
        }
    }

    pub fn match_path(&self, match_key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(match_key)))
    }
}

impl FeedAdapter for DirFeedSource {
    fn fetch_calendar(&mut self) -> Result<Vec<CalendarEntry>, HarvestError> {
        read_to_string(&self.calendar)
            .and_then(|raw| parse_calendar_json(&raw))
            .map_err(HarvestError::CandidatesUnavailable)
    }

    fn fetch_match(&mut self, match_key: &str) -> Result<RawMatchFeed, HarvestError> {
        let path = self.match_path(match_key);
        debug!(match_key, path = %path.display(), "reading feed file");
        read_to_string(&path)
            .and_then(|raw| parse_match_feed_json(&raw))
            .map_err(|err| HarvestError::fetch(match_key, err))
    }
}

/// JSON feeds over HTTP. Per-match feeds live at
/// `<base>/matches/<sanitized key>.json`.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
    base_url: String,
    calendar_url: String,
}

impl HttpFeedSource {
    pub fn new(
        base_url: &str,
        calendar_url: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = http_client(timeout)?.clone();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            calendar_url: calendar_url.to_string(),
        })
    }

    pub fn match_url(&self, match_key: &str) -> String {
        format!("{}/matches/{}.json", self.base_url, sanitize_key(match_key))
    }
}

impl FeedAdapter for HttpFeedSource {
    fn fetch_calendar(&mut self) -> Result<Vec<CalendarEntry>, HarvestError> {
        get_text(&self.client, &self.calendar_url)
            .and_then(|body| parse_calendar_json(&body))
            .map_err(HarvestError::CandidatesUnavailable)
    }

    fn fetch_match(&mut self, match_key: &str) -> Result<RawMatchFeed, HarvestError> {
        let url = self.match_url(match_key);
        debug!(match_key, %url, "requesting feed");
        get_text(&self.client, &url)
            .and_then(|body| parse_match_feed_json(&body))
            .map_err(|err| HarvestError::fetch(match_key, err))
    }
}

/// Builds the adapter named by the config.
pub fn open_feed_source(cfg: &HarvestConfig) -> anyhow::Result<Box<dyn FeedAdapter>> {
    let calendar = cfg.calendar_location();
    match &cfg.feed {
        FeedLocation::Dir(dir) => Ok(Box::new(DirFeedSource::new(dir, calendar))),
        FeedLocation::Http(base) => {
            if !base.starts_with("http://") && !base.starts_with("https://") {
                return Err(anyhow!("feed url must be http(s): {base}"));
            }
            Ok(Box::new(HttpFeedSource::new(
                base,
                &calendar,
                cfg.fetch_timeout,
            )?))
        }
    }
}

/// Match keys are usually site paths; keep them usable as file names.
pub fn sanitize_key(match_key: &str) -> String {
    let trimmed = match_key
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_matches('/');
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

fn read_to_string(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key_flattens_paths() {
        assert_eq!(
            sanitize_key("https://site.example/match/2023/ajax-psv/"),
            "site.example_match_2023_ajax-psv"
        );
        assert_eq!(sanitize_key("m 1?x=2"), "m_1_x_2");
        assert_eq!(sanitize_key("  "), "_");
    }

    #[test]
    fn dir_source_reads_calendar_and_feeds() {
        let dir = tempfile::tempdir().unwrap();
        let calendar = dir.path().join("calendar.json");
        fs::write(
            &calendar,
            r#"[{"url": "m/1", "homeTeam": "A", "homeScore": 1, "awayTeam": "B", "awayScore": 0}]"#,
        )
        .unwrap();
        let mut source = DirFeedSource::new(dir.path(), &calendar);
        fs::write(
            source.match_path("m/1"),
            r#"{"matchKey": "m/1", "scoreText": "1 - 0"}"#,
        )
        .unwrap();

        let entries = source.fetch_calendar().unwrap();
        assert_eq!(entries.len(), 1);
        let feed = source.fetch_match("m/1").unwrap();
        assert_eq!(feed.score_text.as_deref(), Some("1 - 0"));
        let err = source.fetch_match("m/2").unwrap_err();
        assert!(matches!(err, HarvestError::Fetch { .. }));
    }

    #[test]
    fn missing_calendar_is_candidates_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = DirFeedSource::new(dir.path(), dir.path().join("nope.json"));
        assert!(matches!(
            source.fetch_calendar(),
            Err(HarvestError::CandidatesUnavailable(_))
        ));
    }
}
