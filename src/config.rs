use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_OUT_DIR: &str = "data_raw";
const DEFAULT_EVENTS_FILE: &str = "match_events.csv";
const DEFAULT_PLAYERS_FILE: &str = "player_matchdata.csv";
const DEFAULT_FEED_DIR: &str = "data_raw/feeds";
const DEFAULT_CALENDAR_FILE: &str = "match_calendar.json";
const DEFAULT_THROTTLE_MS: u64 = 300;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLocation {
    Dir(PathBuf),
    Http(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    pub out_dir: PathBuf,
    pub events_file: String,
    pub players_file: String,
    pub feed: FeedLocation,
    /// Path for a directory feed, URL for an HTTP feed. Defaults next to the feed.
    pub calendar: Option<String>,
    pub throttle: Duration,
    pub fetch_timeout: Duration,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            events_file: DEFAULT_EVENTS_FILE.to_string(),
            players_file: DEFAULT_PLAYERS_FILE.to_string(),
            feed: FeedLocation::Dir(PathBuf::from(DEFAULT_FEED_DIR)),
            calendar: None,
            throttle: Duration::from_millis(DEFAULT_THROTTLE_MS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl HarvestConfig {
    /// Loads `.env.local` and `.env` if present, then reads `HARVEST_*` vars.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).and_then(|v| non_empty(&v).map(str::to_string));
        let mut cfg = Self::default();

        if let Some(dir) = get("HARVEST_OUT_DIR") {
            cfg.out_dir = PathBuf::from(dir);
        }
        if let Some(name) = get("HARVEST_EVENTS_FILE") {
            cfg.events_file = name;
        }
        if let Some(name) = get("HARVEST_PLAYERS_FILE") {
            cfg.players_file = name;
        }
        if let Some(url) = get("HARVEST_FEED_URL") {
            cfg.feed = FeedLocation::Http(url);
        } else if let Some(dir) = get("HARVEST_FEED_DIR") {
            cfg.feed = FeedLocation::Dir(PathBuf::from(dir));
        }
        cfg.calendar = get("HARVEST_CALENDAR");
        cfg.throttle = Duration::from_millis(
            get("HARVEST_THROTTLE_MS")
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(DEFAULT_THROTTLE_MS)
                .clamp(0, 10_000),
        );
        cfg.fetch_timeout = Duration::from_secs(
            get("HARVEST_FETCH_TIMEOUT_SECS")
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS)
                .clamp(1, 120),
        );
        cfg
    }

    /// Applies `--flag value` / `--flag=value` overrides.
    pub fn apply_args(&mut self, args: &[String]) {
        if let Some(dir) = flag_value(args, "--out") {
            self.out_dir = PathBuf::from(dir);
        }
        if let Some(url) = flag_value(args, "--feed-url") {
            self.feed = FeedLocation::Http(url);
        } else if let Some(dir) = flag_value(args, "--feeds") {
            self.feed = FeedLocation::Dir(PathBuf::from(dir));
        }
        if let Some(calendar) = flag_value(args, "--calendar") {
            self.calendar = Some(calendar);
        }
        if let Some(ms) = flag_value(args, "--throttle-ms").and_then(|v| v.parse::<u64>().ok()) {
            self.throttle = Duration::from_millis(ms.clamp(0, 10_000));
        }
    }

    pub fn events_path(&self) -> PathBuf {
        self.out_dir.join(&self.events_file)
    }

    pub fn players_path(&self) -> PathBuf {
        self.out_dir.join(&self.players_file)
    }

    pub fn calendar_location(&self) -> String {
        if let Some(calendar) = self.calendar.as_deref() {
            return calendar.to_string();
        }
        match &self.feed {
            FeedLocation::Dir(dir) => dir.join(DEFAULT_CALENDAR_FILE).display().to_string(),
            FeedLocation::Http(base) => {
                format!("{}/{DEFAULT_CALENDAR_FILE}", base.trim_end_matches('/'))
            }
        }
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix)
            && let Some(value) = non_empty(value)
        {
            return Some(value.to_string());
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && let Some(value) = non_empty(next)
        {
            return Some(value.to_string());
        }
    }
    None
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
