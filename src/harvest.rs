use std::collections::HashSet;
use std::fmt;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::export::{EVENTS_SCHEMA, PLAYERS_SCHEMA, event_rows, player_rows};
use crate::feed::{CalendarEntry, FeedAdapter};
use crate::ledger::HarvestLedger;
use crate::record::{HarvestedMatch, build_match};
use crate::store::RecordStore;

/// The two append-only outputs of a run.
#[derive(Debug, Clone)]
pub struct HarvestStores {
    pub events: RecordStore,
    pub players: RecordStore,
}

impl HarvestStores {
    pub fn from_config(cfg: &HarvestConfig) -> Self {
        Self {
            events: RecordStore::new(cfg.events_path(), EVENTS_SCHEMA),
            players: RecordStore::new(cfg.players_path(), PLAYERS_SCHEMA),
        }
    }

    pub fn ledger(&self) -> HarvestLedger {
        HarvestLedger::load(&[&self.events, &self.players])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    CandidatesUnavailable,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => f.write_str("completed"),
            RunStatus::CandidatesUnavailable => f.write_str("candidates unavailable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Harvested { events: usize, players: usize },
    /// Nothing usable for player rows; any event rows were still written.
    NoData { events: usize },
    Errored,
}

#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub eligible: usize,
    pub already_done: usize,
    pub candidates: usize,
    pub succeeded: usize,
    pub no_data: usize,
    pub errored: usize,
    pub events_written: usize,
    pub players_written: usize,
    pub dedup_enabled: bool,
    pub errors: Vec<String>,
}

impl HarvestSummary {
    fn started() -> Self {
        Self {
            status: RunStatus::Completed,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            eligible: 0,
            already_done: 0,
            candidates: 0,
            succeeded: 0,
            no_data: 0,
            errored: 0,
            events_written: 0,
            players_written: 0,
            dedup_enabled: true,
            errors: Vec::new(),
        }
    }

    pub fn rows_written(&self) -> usize {
        self.events_written + self.players_written
    }

    fn tally(&mut self, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::Harvested { events, players } => {
                self.succeeded += 1;
                self.events_written += events;
                self.players_written += players;
            }
            MatchOutcome::NoData { events } => {
                self.no_data += 1;
                self.events_written += events;
            }
            MatchOutcome::Errored => self.errored += 1,
        }
    }
}

/// One full pass: calendar, ledger, then every pending match in calendar
/// order. Per-match failures are counted and never end the run.
pub fn run_harvest<A: FeedAdapter + ?Sized>(
    adapter: &mut A,
    stores: &HarvestStores,
    throttle: Duration,
) -> HarvestSummary {
    let mut summary = HarvestSummary::started();

    let calendar = match adapter.fetch_calendar() {
        Ok(calendar) => calendar,
        Err(err) => {
            error!(error = %err, "no candidate list, ending run");
            summary.status = RunStatus::CandidatesUnavailable;
            summary.errors.push(err.to_string());
            summary.finished_at = Utc::now();
            return summary;
        }
    };

    let mut ledger = stores.ledger();
    summary.dedup_enabled = ledger.is_dedup_enabled();
    summary.eligible = calendar
        .iter()
        .filter(|e| e.is_eligible())
        .map(|e| e.key())
        .collect::<HashSet<_>>()
        .len();
    let pending = ledger
        .pending(&calendar)
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    summary.candidates = pending.len();
    summary.already_done = summary.eligible.saturating_sub(pending.len());
    info!(
        eligible = summary.eligible,
        already_done = summary.already_done,
        candidates = summary.candidates,
        "harvest starting"
    );

    for (idx, entry) in pending.iter().enumerate() {
        if idx > 0 && !throttle.is_zero() {
            thread::sleep(throttle);
        }
        let outcome = harvest_one(adapter, stores, entry, &mut ledger, &mut summary.errors);
        summary.tally(outcome);
    }

    summary.finished_at = Utc::now();
    info!(
        status = %summary.status,
        succeeded = summary.succeeded,
        no_data = summary.no_data,
        errored = summary.errored,
        rows = summary.rows_written(),
        "harvest finished"
    );
    summary
}

fn harvest_one<A: FeedAdapter + ?Sized>(
    adapter: &mut A,
    stores: &HarvestStores,
    entry: &CalendarEntry,
    ledger: &mut HarvestLedger,
    errors: &mut Vec<String>,
) -> MatchOutcome {
    let key = entry.key();
    let built = adapter
        .fetch_match(key)
        .and_then(|feed| build_match(key, &feed, Some(entry)));
    let harvested = match built {
        Ok(harvested) => harvested,
        Err(err @ HarvestError::Extraction { .. }) => {
            warn!(match_key = key, error = %err, "no data in feed");
            ledger.record(key);
            return MatchOutcome::NoData { events: 0 };
        }
        Err(err) => {
            error!(match_key = key, error = %err, "match skipped");
            errors.push(err.to_string());
            return MatchOutcome::Errored;
        }
    };
    report_diagnostics(key, &harvested);

    match write_match(stores, &harvested) {
        Ok((events, players)) => {
            ledger.record(key);
            debug!(match_key = key, events, players, "match appended");
            if harvested.has_roster() {
                MatchOutcome::Harvested { events, players }
            } else {
                warn!(match_key = key, "no roster rows in feed");
                MatchOutcome::NoData { events }
            }
        }
        Err(err) => {
            error!(match_key = key, error = %err, "append failed");
            errors.push(err.to_string());
            MatchOutcome::Errored
        }
    }
}

// Both blocks are serialized before either store is touched. If the player
// block fails, the event block is truncated away so the match stays pending.
fn write_match(
    stores: &HarvestStores,
    harvested: &HarvestedMatch,
) -> Result<(usize, usize), HarvestError> {
    let events = event_rows(harvested);
    let players = player_rows(harvested);
    let events_mark = stores.events.mark()?;
    let events_written = stores.events.append_block(&events)?;
    match stores.players.append_block(&players) {
        Ok(players_written) => Ok((events_written, players_written)),
        Err(err) => {
            if let Err(undo) = stores.events.rollback(events_mark) {
                error!(
                    match_key = %harvested.record.match_id,
                    error = %undo,
                    "event rows left without player rows"
                );
            }
            Err(err)
        }
    }
}

fn report_diagnostics(key: &str, harvested: &HarvestedMatch) {
    if harvested.low_confidence_minutes > 0 {
        warn!(
            match_key = key,
            events = harvested.low_confidence_minutes,
            "unreadable minutes defaulted to 0"
        );
    }
    for issue in &harvested.inconsistencies {
        warn!(match_key = key, "{issue}");
    }
}
