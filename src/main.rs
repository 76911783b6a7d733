use std::process::ExitCode;

use anyhow::{Context, Result};

use matchharvest::config::HarvestConfig;
use matchharvest::feed_source::open_feed_source;
use matchharvest::{HarvestStores, RunStatus, logging, run_harvest};

fn main() -> Result<ExitCode> {
    logging::init();

    let mut cfg = HarvestConfig::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    cfg.apply_args(&args);

    let mut source = open_feed_source(&cfg).context("unable to open feed source")?;
    let stores = HarvestStores::from_config(&cfg);
    let summary = run_harvest(source.as_mut(), &stores, cfg.throttle);

    println!("Harvest {}", summary.status);
    println!("Events store: {}", stores.events.path().display());
    println!("Players store: {}", stores.players.path().display());
    println!(
        "Started: {}  Finished: {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S"),
        summary.finished_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "Eligible: {}  already harvested: {}  candidates: {}",
        summary.eligible, summary.already_done, summary.candidates
    );
    println!(
        "Succeeded: {}  no data: {}  errored: {}",
        summary.succeeded, summary.no_data, summary.errored
    );
    println!(
        "Rows appended: events={} players={}",
        summary.events_written, summary.players_written
    );
    if !summary.dedup_enabled {
        println!("Dedup was disabled: a store's key column could not be read");
    }
    if !summary.errors.is_empty() {
        println!("  errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(6) {
            println!("   - {err}");
        }
    }

    Ok(match summary.status {
        RunStatus::Completed => ExitCode::SUCCESS,
        RunStatus::CandidatesUnavailable => ExitCode::FAILURE,
    })
}
