use std::fs;
use std::path::Path;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use matchharvest::export::{EVENTS_SCHEMA, PLAYERS_SCHEMA};
use matchharvest::fake_feed::{FakeFeed, calendar_entry_for, synthetic_feed};
use matchharvest::feed::{CalendarEntry, Panel, RawMatchFeed, RawTimelineItem};
use matchharvest::store::RecordStore;
use matchharvest::{HarvestStores, RunStatus, logging, run_harvest};

fn stores(dir: &Path) -> HarvestStores {
    HarvestStores {
        events: RecordStore::new(dir.join("match_events.csv"), EVENTS_SCHEMA),
        players: RecordStore::new(dir.join("player_matchdata.csv"), PLAYERS_SCHEMA),
    }
}

fn feeds(keys: &[&str]) -> Vec<RawMatchFeed> {
    let mut rng = StdRng::seed_from_u64(11);
    keys.iter().map(|key| synthetic_feed(&mut rng, key)).collect()
}

fn fake(feeds: &[RawMatchFeed]) -> FakeFeed {
    let calendar = feeds.iter().map(calendar_entry_for).collect();
    feeds
        .iter()
        .cloned()
        .fold(FakeFeed::new(calendar), FakeFeed::with_feed)
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).map(|s| s.lines().count()).unwrap_or(0)
}

#[test]
fn second_run_harvests_only_new_matches() {
    logging::init_test();
    let dir = tempfile::tempdir().unwrap();
    let stores = stores(dir.path());
    let all = feeds(&["A", "B", "C"]);

    let mut source = fake(&all);
    source.set_calendar(all[..2].iter().map(calendar_entry_for).collect());
    let first = run_harvest(&mut source, &stores, Duration::ZERO);
    assert_eq!(first.status, RunStatus::Completed);
    assert_eq!(first.succeeded, 2);
    assert_eq!(source.fetched(), ["A".to_string(), "B".to_string()]);

    source.set_calendar(all.iter().map(calendar_entry_for).collect());
    source.clear_fetched();
    let second = run_harvest(&mut source, &stores, Duration::ZERO);
    assert_eq!(second.already_done, 2);
    assert_eq!(second.candidates, 1);
    assert_eq!(second.succeeded, 1);
    assert_eq!(source.fetched(), ["C".to_string()]);
    assert_eq!(stores.players.read_keys().unwrap().len(), 3);
}

#[test]
fn rerun_on_unchanged_calendar_appends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let stores = stores(dir.path());
    let mut source = fake(&feeds(&["A", "B"]));

    let first = run_harvest(&mut source, &stores, Duration::ZERO);
    assert!(first.rows_written() > 0);
    let events_lines = line_count(stores.events.path());
    let players_lines = line_count(stores.players.path());
    assert_eq!(players_lines, 1 + first.players_written);

    source.clear_fetched();
    let second = run_harvest(&mut source, &stores, Duration::ZERO);
    assert_eq!(second.rows_written(), 0);
    assert_eq!(second.candidates, 0);
    assert!(source.fetched().is_empty());
    assert_eq!(line_count(stores.events.path()), events_lines);
    assert_eq!(line_count(stores.players.path()), players_lines);
}

#[test]
fn fetch_failures_are_counted_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let stores = stores(dir.path());
    let mut source = fake(&feeds(&["A", "B", "C"])).with_failure("B");

    let summary = run_harvest(&mut source, &stores, Duration::ZERO);
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!((summary.succeeded, summary.errored), (2, 1));
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("B"));

    // The failed match is retried on the next run.
    let mut retry = fake(&feeds(&["A", "B", "C"]));
    let summary = run_harvest(&mut retry, &stores, Duration::ZERO);
    assert_eq!(retry.fetched(), ["B".to_string()]);
    assert_eq!(summary.succeeded, 1);
}

#[test]
fn feeds_without_roster_count_as_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let stores = stores(dir.path());
    let timeline_only = RawMatchFeed {
        match_key: "T".to_string(),
        score_text: Some("1 - 0".to_string()),
        timeline: vec![RawTimelineItem {
            markers: vec!["goal".to_string()],
            minute_text: Some("9'".to_string()),
            first_name: Some("Sem".to_string()),
            last_name: Some("Bos".to_string()),
            panel: Panel::Left,
        }],
        ..RawMatchFeed::default()
    };
    let empty = RawMatchFeed {
        match_key: "E".to_string(),
        score_text: Some("0 - 0".to_string()),
        ..RawMatchFeed::default()
    };
    let mut source = fake(&[timeline_only, empty]);

    let summary = run_harvest(&mut source, &stores, Duration::ZERO);
    assert_eq!(summary.no_data, 2);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.events_written, 1);
    assert_eq!(summary.players_written, 0);
    assert!(!stores.players.path().exists());

    source.clear_fetched();
    run_harvest(&mut source, &stores, Duration::ZERO);
    assert_eq!(source.fetched(), ["E".to_string()]);
}

#[test]
fn failed_player_append_leaves_match_pending() {
    let dir = tempfile::tempdir().unwrap();
    let stores = stores(dir.path());
    fs::create_dir(stores.players.path()).unwrap();
    let mut source = fake(&feeds(&["A"]));

    let first = run_harvest(&mut source, &stores, Duration::ZERO);
    assert_eq!(first.errored, 1);
    assert_eq!(line_count(stores.events.path()), 0);
    assert!(stores.events.read_keys().unwrap().is_empty());

    fs::remove_dir(stores.players.path()).unwrap();
    source.clear_fetched();
    let second = run_harvest(&mut source, &stores, Duration::ZERO);
    assert_eq!(source.fetched(), ["A".to_string()]);
    assert_eq!(second.succeeded, 1);
    assert_eq!(line_count(stores.players.path()), 1 + second.players_written);
    if second.events_written > 0 {
        assert_eq!(line_count(stores.events.path()), 1 + second.events_written);
    }
}

#[test]
fn whitespace_only_stores_stay_deduplicated() {
    let dir = tempfile::tempdir().unwrap();
    let stores = stores(dir.path());
    fs::write(stores.events.path(), "\n").unwrap();
    fs::write(stores.players.path(), "\n").unwrap();
    let mut source = fake(&feeds(&["A"]));

    let first = run_harvest(&mut source, &stores, Duration::ZERO);
    assert!(first.dedup_enabled);
    assert_eq!(first.succeeded, 1);
    let players = fs::read_to_string(stores.players.path()).unwrap();
    assert!(players.starts_with("Match URL,"));

    source.clear_fetched();
    let second = run_harvest(&mut source, &stores, Duration::ZERO);
    assert!(second.dedup_enabled);
    assert_eq!(second.rows_written(), 0);
    assert!(source.fetched().is_empty());
}

#[test]
fn padded_calendar_key_is_harvested_once() {
    let dir = tempfile::tempdir().unwrap();
    let stores = stores(dir.path());
    let all = feeds(&["m/1"]);
    let mut source = fake(&all);
    let mut entry = calendar_entry_for(&all[0]);
    entry.match_key = "m/1 ".to_string();
    source.set_calendar(vec![entry]);

    let first = run_harvest(&mut source, &stores, Duration::ZERO);
    assert_eq!(first.succeeded, 1);
    assert!(stores.players.read_keys().unwrap().contains("m/1"));

    source.clear_fetched();
    let second = run_harvest(&mut source, &stores, Duration::ZERO);
    assert_eq!(second.rows_written(), 0);
    assert_eq!(second.already_done, 1);
    assert!(source.fetched().is_empty());
}

#[test]
fn corrupt_key_column_disables_dedup() {
    let dir = tempfile::tempdir().unwrap();
    let stores = stores(dir.path());
    fs::write(stores.players.path(), "Player Name,Team\nSomeone,X\n").unwrap();
    let mut source = fake(&feeds(&["A"]));

    let first = run_harvest(&mut source, &stores, Duration::ZERO);
    assert!(!first.dedup_enabled);
    assert_eq!(first.succeeded, 1);

    source.clear_fetched();
    let second = run_harvest(&mut source, &stores, Duration::ZERO);
    assert!(!second.dedup_enabled);
    assert_eq!(source.fetched(), ["A".to_string()]);
}

#[test]
fn missing_calendar_ends_run_with_status() {
    let dir = tempfile::tempdir().unwrap();
    let stores = stores(dir.path());
    let mut source = FakeFeed::without_calendar();

    let summary = run_harvest(&mut source, &stores, Duration::ZERO);
    assert_eq!(summary.status, RunStatus::CandidatesUnavailable);
    assert_eq!(summary.candidates, 0);
    assert_eq!(summary.errors.len(), 1);
    assert!(!stores.events.path().exists());
}

#[test]
fn unscored_and_duplicate_calendar_entries_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let stores = stores(dir.path());
    let all = feeds(&["A"]);
    let mut source = fake(&all);
    let unscored = CalendarEntry {
        match_key: "later".to_string(),
        date: String::new(),
        home_team: "X".to_string(),
        home_score: None,
        away_team: "Y".to_string(),
        away_score: None,
    };
    let entry = calendar_entry_for(&all[0]);
    source.set_calendar(vec![entry.clone(), unscored, entry]);

    let summary = run_harvest(&mut source, &stores, Duration::ZERO);
    assert_eq!(summary.eligible, 1);
    assert_eq!(summary.candidates, 1);
    assert_eq!(summary.already_done, 0);
    assert_eq!(source.fetched(), ["A".to_string()]);
}

#[test]
fn match_rows_are_contiguous_with_home_first() {
    let dir = tempfile::tempdir().unwrap();
    let stores = stores(dir.path());
    let mut source = fake(&feeds(&["A", "B"]));
    run_harvest(&mut source, &stores, Duration::ZERO);

    let mut reader = csv::Reader::from_path(stores.players.path()).unwrap();
    let rows = reader
        .records()
        .map(|r| r.unwrap())
        .map(|r| (r[0].to_string(), r[5].to_string(), r[2].to_string()))
        .collect::<Vec<_>>();
    let keys = rows.iter().map(|r| r.0.as_str()).collect::<Vec<_>>();
    let first_b = keys.iter().position(|k| *k == "B").unwrap();
    assert!(keys[..first_b].iter().all(|k| *k == "A"));
    assert!(keys[first_b..].iter().all(|k| *k == "B"));

    let sides = rows[..first_b]
        .iter()
        .map(|(_, team, away)| team == away)
        .collect::<Vec<_>>();
    let first_away = sides.iter().position(|away| *away).unwrap();
    assert!(sides[first_away..].iter().all(|away| *away));
}
