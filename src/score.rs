use crate::events::{Event, Side};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    pub fn for_side(self, side: Side) -> u32 {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    pub fn against_side(self, side: Side) -> u32 {
        self.for_side(side.opponent())
    }

    fn bump(&mut self, side: Side) {
        match side {
            Side::Home => self.home += 1,
            Side::Away => self.away += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorePoint {
    pub minute: u16,
    pub score: Score,
}

/// Step function minute -> cumulative score, one step per scoring event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trajectory {
    points: Vec<ScorePoint>,
}

impl Trajectory {
    /// `events` must already be in normalized order.
    pub fn replay(events: &[Event]) -> Self {
        let mut score = Score::default();
        let mut points = Vec::new();
        for event in events.iter().filter(|e| e.kind.is_scoring()) {
            score.bump(event.side);
            points.push(ScorePoint {
                minute: event.minute,
                score,
            });
        }
        Self { points }
    }

    pub fn points(&self) -> &[ScorePoint] {
        &self.points
    }

    /// Score once every goal up to and including `minute` has counted.
    pub fn score_at(&self, minute: u16) -> Score {
        self.points
            .iter()
            .take_while(|p| p.minute <= minute)
            .last()
            .map(|p| p.score)
            .unwrap_or_default()
    }

    pub fn final_score(&self) -> Score {
        self.points.last().map(|p| p.score).unwrap_or_default()
    }
}

/// Score after each event, aligned index-for-index with `events`.
pub fn running_scores(events: &[Event]) -> Vec<Score> {
    let mut score = Score::default();
    events
        .iter()
        .map(|event| {
            if event.kind.is_scoring() {
                score.bump(event.side);
            }
            score
        })
        .collect()
}

pub fn tally(events: &[Event]) -> Score {
    tally_where(events, |_| true)
}

/// Goals with `start <= minute <= end`.
pub fn tally_in_range(events: &[Event], start: u16, end: u16) -> Score {
    tally_where(events, |m| m >= start && m <= end)
}

/// Goals with `minute < start || minute > end`.
pub fn tally_outside_range(events: &[Event], start: u16, end: u16) -> Score {
    tally_where(events, |m| m < start || m > end)
}

fn tally_where(events: &[Event], keep: impl Fn(u16) -> bool) -> Score {
    let mut score = Score::default();
    for event in events {
        if event.kind.is_scoring() && keep(event.minute) {
            score.bump(event.side);
        }
    }
    score
}
