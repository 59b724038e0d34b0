pub mod errors;
pub mod time;

pub use errors::{
    ControlResult, ExitMapping, PipelineError, PipelineErrorCategory, PipelineResult,
};
pub use time::{TimeAxis, format_iso_minute, format_release_time};

use chrono::NaiveDateTime;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// The period-count line is the only source of direction: negative counts
    /// run backward, everything else forward.
    pub const fn from_period_count(period_count: i64) -> Self {
        if period_count < 0 {
            Self::Backward
        } else {
            Self::Forward
        }
    }

    pub const fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "fwd",
            Self::Backward => "bwd",
        }
    }

    pub const fn signed(self, count: u32) -> i64 {
        match self {
            Self::Forward => count as i64,
            Self::Backward => -(count as i64),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fwd" | "forward" | "true" => Some(Self::Forward),
            "bwd" | "backward" | "false" => Some(Self::Backward),
            _ => None,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    SingleTrajectory,
    EnsembleTrajectory,
    Concentration,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 3] = [
        Self::SingleTrajectory,
        Self::EnsembleTrajectory,
        Self::Concentration,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SingleTrajectory => "SINGLE_TRAJECTORY",
            Self::EnsembleTrajectory => "ENSEMBLE_TRAJECTORY",
            Self::Concentration => "CONCENTRATION",
        }
    }

    /// Only the ensemble phase runs without the parallel launcher.
    pub const fn is_parallel(self) -> bool {
        !matches!(self, Self::EnsembleTrajectory)
    }
}

impl Display for PhaseKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Web-supplied parameters for one direction of one simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
    pub direction: Direction,
    pub record_count: u32,
    pub start_time: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    pub simulation_id: String,
    pub parameters: RunParameters,
}

impl SimulationRequest {
    pub fn new(simulation_id: impl Into<String>, parameters: RunParameters) -> Self {
        Self {
            simulation_id: simulation_id.into(),
            parameters,
        }
    }

    pub fn direction(&self) -> Direction {
        self.parameters.direction
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, PhaseKind};

    #[test]
    fn period_count_sign_selects_direction() {
        assert_eq!(Direction::from_period_count(-5), Direction::Backward);
        assert_eq!(Direction::from_period_count(0), Direction::Forward);
        assert_eq!(Direction::from_period_count(12), Direction::Forward);
    }

    #[test]
    fn signed_count_round_trips_through_direction() {
        for count in [0_u32, 1, 6, 48] {
            for direction in [Direction::Forward, Direction::Backward] {
                let signed = direction.signed(count);
                assert_eq!(signed.unsigned_abs(), u64::from(count));
                if count > 0 {
                    assert_eq!(Direction::from_period_count(signed), direction);
                }
            }
        }
    }

    #[test]
    fn direction_parses_request_spellings() {
        assert_eq!(Direction::parse("fwd"), Some(Direction::Forward));
        assert_eq!(Direction::parse("TRUE"), Some(Direction::Forward));
        assert_eq!(Direction::parse("backward"), Some(Direction::Backward));
        assert_eq!(Direction::parse("sideways"), None);
    }

    #[test]
    fn ensemble_phase_is_not_parallel() {
        let parallel = PhaseKind::ALL
            .iter()
            .filter(|phase| phase.is_parallel())
            .count();
        assert_eq!(parallel, 2);
        assert!(!PhaseKind::EnsembleTrajectory.is_parallel());
    }
}
