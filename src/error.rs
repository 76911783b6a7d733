use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("fetch failed for {key}: {source}")]
    Fetch {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no usable data for {key}: {reason}")]
    Extraction { key: String, reason: String },

    #[error("candidate list unavailable: {0}")]
    CandidatesUnavailable(#[source] anyhow::Error),

    #[error("ledger key column unusable in {}: {reason}", path.display())]
    LedgerCorruption { path: PathBuf, reason: String },

    #[error("store write failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl HarvestError {
    pub fn fetch(key: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        HarvestError::Fetch {
            key: key.into(),
            source: source.into(),
        }
    }

    pub fn extraction(key: impl Into<String>, reason: impl Into<String>) -> Self {
        HarvestError::Extraction {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Conflicting signals found while building one match. Logged and resolved,
/// never returned as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    SubOutAndCard {
        player: String,
        sub_out: u16,
        card: u16,
    },
    YellowRedAndRed {
        player: String,
        yellow_red: u16,
        red: u16,
    },
    WindowInverted {
        player: String,
        start: u16,
        end: u16,
    },
    WindowPastMatchEnd {
        player: String,
        end: u16,
        match_end: u16,
    },
    ScoreMismatch {
        home_events: u32,
        away_events: u32,
        home_final: u32,
        away_final: u32,
    },
    HeaderScoreDiffers {
        header: (u32, u32),
        calendar: (u32, u32),
    },
}

impl std::fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Inconsistency::SubOutAndCard {
                player,
                sub_out,
                card,
            } => write!(
                f,
                "{player}: substituted out at {sub_out} and sent off at {card}"
            ),
            Inconsistency::YellowRedAndRed {
                player,
                yellow_red,
                red,
            } => write!(
                f,
                "{player}: yellow-red at {yellow_red} and red at {red}, using yellow-red"
            ),
            Inconsistency::WindowInverted { player, start, end } => {
                write!(f, "{player}: window ends at {end} before it starts at {start}")
            }
            Inconsistency::WindowPastMatchEnd {
                player,
                end,
                match_end,
            } => write!(
                f,
                "{player}: window end {end} is past match end {match_end}, clamped"
            ),
            Inconsistency::ScoreMismatch {
                home_events,
                away_events,
                home_final,
                away_final,
            } => write!(
                f,
                "timeline tallies {home_events}-{away_events} but final score is {home_final}-{away_final}"
            ),
            Inconsistency::HeaderScoreDiffers { header, calendar } => write!(
                f,
                "header score {}-{} differs from calendar {}-{}",
                header.0, header.1, calendar.0, calendar.1
            ),
        }
    }
}
