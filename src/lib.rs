pub mod attribution;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod fake_feed;
pub mod feed;
pub mod feed_source;
pub mod harvest;
pub mod http_client;
pub mod ledger;
pub mod lineup;
pub mod logging;
pub mod record;
pub mod score;
pub mod store;

pub use error::{HarvestError, Inconsistency};
pub use harvest::{HarvestStores, HarvestSummary, RunStatus, run_harvest};
