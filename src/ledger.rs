use std::collections::HashSet;

use tracing::{info, warn};

use crate::feed::CalendarEntry;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerPhase {
    Empty,
    Loaded,
    Appending,
}

/// Which match keys already have rows on disk. Rebuilt from the stores at
/// the start of every run; there is no separate journal.
#[derive(Debug, Clone)]
pub struct HarvestLedger {
    phase: LedgerPhase,
    keys: HashSet<String>,
    dedup_enabled: bool,
}

impl Default for HarvestLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl HarvestLedger {
    pub fn new() -> Self {
        Self {
            phase: LedgerPhase::Empty,
            keys: HashSet::new(),
            dedup_enabled: true,
        }
    }

    /// Union of the key columns of every store. If any store's key column is
    /// unusable, dedup is switched off for the run instead of failing it.
    pub fn load(stores: &[&RecordStore]) -> Self {
        let mut ledger = Self::new();
        for store in stores {
            match store.read_keys() {
                Ok(keys) => ledger.keys.extend(keys),
                Err(err) => {
                    warn!(store = %store.path().display(), error = %err, "dedup disabled for this run");
                    ledger.dedup_enabled = false;
                }
            }
        }
        if !ledger.dedup_enabled {
            ledger.keys.clear();
        }
        ledger.phase = LedgerPhase::Loaded;
        info!(
            keys = ledger.keys.len(),
            dedup = ledger.dedup_enabled,
            "ledger loaded"
        );
        ledger
    }

    pub fn phase(&self) -> LedgerPhase {
        self.phase
    }

    pub fn is_dedup_enabled(&self) -> bool {
        self.dedup_enabled
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> &HashSet<String> {
        &self.keys
    }

    /// Eligible entries not yet harvested, in calendar order, each key once.
    pub fn pending<'a>(&self, calendar: &'a [CalendarEntry]) -> Vec<&'a CalendarEntry> {
        let mut seen = HashSet::new();
        calendar
            .iter()
            .filter(|entry| entry.is_eligible())
            .filter(|entry| !self.contains(entry.key()))
            .filter(|entry| seen.insert(entry.key().to_string()))
            .collect()
    }

    pub fn record(&mut self, key: &str) {
        self.keys.insert(key.trim().to_string());
        self.phase = LedgerPhase::Appending;
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::export::{EVENTS_SCHEMA, PLAYERS_SCHEMA};

    fn entry(key: &str, scored: bool) -> CalendarEntry {
        CalendarEntry {
            match_key: key.to_string(),
            date: String::new(),
            home_team: "H".to_string(),
            home_score: scored.then_some(1),
            away_team: "A".to_string(),
            away_score: scored.then_some(0),
        }
    }

    #[test]
    fn phases_advance() {
        let dir = tempfile::tempdir().unwrap();
        let events = RecordStore::new(dir.path().join("e.csv"), EVENTS_SCHEMA);
        let mut ledger = HarvestLedger::new();
        assert_eq!(ledger.phase(), LedgerPhase::Empty);
        ledger = HarvestLedger::load(&[&events]);
        assert_eq!(ledger.phase(), LedgerPhase::Loaded);
        ledger.record("m1");
        assert_eq!(ledger.phase(), LedgerPhase::Appending);
        assert!(ledger.contains("m1"));
    }

    #[test]
    fn pending_filters_scored_unseen_and_duplicates() {
        let mut ledger = HarvestLedger::new();
        ledger.record("a");
        let calendar = vec![
            entry("a", true),
            entry("b", true),
            entry("c", false),
            entry("b", true),
            entry("d", true),
        ];
        let keys = ledger
            .pending(&calendar)
            .into_iter()
            .map(|e| e.match_key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["b", "d"]);
    }

    #[test]
    fn padded_calendar_keys_match_stored_keys() {
        let dir = tempfile::tempdir().unwrap();
        let events = RecordStore::new(dir.path().join("e.csv"), EVENTS_SCHEMA);
        fs::write(events.path(), "matchurl,minute
m/1,3
").unwrap();
        let ledger = HarvestLedger::load(&[&events]);
        let calendar = vec![entry(" m/1 ", true), entry("m/2", true), entry("m/2 ", true)];
        let keys = ledger
            .pending(&calendar)
            .into_iter()
            .map(|e| e.key())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["m/2"]);
    }

    #[test]
    fn union_across_stores() {
        let dir = tempfile::tempdir().unwrap();
        let events = RecordStore::new(dir.path().join("e.csv"), EVENTS_SCHEMA);
        let players = RecordStore::new(dir.path().join("p.csv"), PLAYERS_SCHEMA);
        fs::write(events.path(), "matchurl,minute\nm1,3\nm1,9\nm2,4\n").unwrap();
        fs::write(players.path(), "\"Match URL\",x\n\"m3\",1\n").unwrap();
        let ledger = HarvestLedger::load(&[&events, &players]);
        assert!(ledger.is_dedup_enabled());
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn corrupt_store_disables_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let events = RecordStore::new(dir.path().join("e.csv"), EVENTS_SCHEMA);
        let players = RecordStore::new(dir.path().join("p.csv"), PLAYERS_SCHEMA);
        fs::write(events.path(), "matchurl\nm1\n").unwrap();
        fs::write(players.path(), "Player Name\nX\n").unwrap();
        let ledger = HarvestLedger::load(&[&events, &players]);
        assert!(!ledger.is_dedup_enabled());
        assert!(ledger.is_empty());
        assert_eq!(ledger.pending(&[entry("m1", true)]).len(), 1);
    }
}
