use super::Direction;
use chrono::{Duration, NaiveDateTime, Timelike};

pub const ISO_MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
pub const RELEASE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Hourly stamps derived from a control header. Nothing is stored beyond the
/// three inputs, so the same inputs always reproduce the same sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAxis {
    start: NaiveDateTime,
    direction: Direction,
    count: usize,
}

impl TimeAxis {
    pub fn new(start: NaiveDateTime, direction: Direction, count: usize) -> Self {
        Self {
            start,
            direction,
            count,
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Stamps in simulation order: descending for backward runs.
    pub fn simulation_order(&self) -> Vec<NaiveDateTime> {
        (0..self.count)
            .map(|step| {
                let offset = Duration::hours(step as i64);
                match self.direction {
                    Direction::Forward => self.start + offset,
                    Direction::Backward => self.start - offset,
                }
            })
            .collect()
    }

    pub fn chronological(&self) -> Vec<NaiveDateTime> {
        let mut stamps = self.simulation_order();
        if !self.direction.is_forward() {
            stamps.reverse();
        }
        stamps
    }
}

pub fn format_iso_minute(stamp: NaiveDateTime) -> String {
    round_to_minute(stamp).format(ISO_MINUTE_FORMAT).to_string()
}

pub fn format_release_time(stamp: NaiveDateTime) -> String {
    stamp.format(RELEASE_TIME_FORMAT).to_string()
}

fn round_to_minute(stamp: NaiveDateTime) -> NaiveDateTime {
    let truncated = stamp
        .with_second(0)
        .and_then(|value| value.with_nanosecond(0))
        .unwrap_or(stamp);
    if stamp.second() >= 30 {
        truncated + Duration::minutes(1)
    } else {
        truncated
    }
}
