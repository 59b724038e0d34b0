use crate::domain::{Direction, PhaseKind, TimeAxis};
use chrono::NaiveDateTime;

/// Fields every control kind carries at the same fixed lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlHeader {
    pub start_time: NaiveDateTime,
    pub site_count: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub height_agl: f64,
    /// Signed: the sign is the run direction.
    pub period_count: i64,
    pub meteorology_file: String,
}

impl ControlHeader {
    pub fn direction(&self) -> Direction {
        Direction::from_period_count(self.period_count)
    }

    pub fn record_count(&self) -> u64 {
        self.period_count.unsigned_abs()
    }

    /// One stamp per hour boundary, release hour included.
    pub fn time_axis(&self) -> TimeAxis {
        TimeAxis::new(
            self.start_time,
            self.direction(),
            self.record_count() as usize + 1,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrajectoryFields {
    pub output_file: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcentrationFields {
    pub release_duration: f64,
    pub output_file: String,
    pub height_bounds: Vec<f64>,
    pub deposition_settings: [f64; 4],
}

impl ConcentrationFields {
    /// Deposition is modeled only when none of the four settings is zero.
    pub fn deposition_active(&self) -> bool {
        self.deposition_settings.iter().all(|setting| *setting != 0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlBody {
    Trajectory(TrajectoryFields),
    Ensemble(TrajectoryFields),
    Concentration(ConcentrationFields),
}

/// A parsed control file. `lines` keeps the text of every line the typed
/// fields do not own so serialization reproduces the template around them.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlRecord {
    pub(super) lines: Vec<String>,
    pub header: ControlHeader,
    pub body: ControlBody,
}

impl ControlRecord {
    pub fn kind(&self) -> PhaseKind {
        match self.body {
            ControlBody::Trajectory(_) => PhaseKind::SingleTrajectory,
            ControlBody::Ensemble(_) => PhaseKind::EnsembleTrajectory,
            ControlBody::Concentration(_) => PhaseKind::Concentration,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn direction(&self) -> Direction {
        self.header.direction()
    }

    pub fn output_file(&self) -> &str {
        match &self.body {
            ControlBody::Trajectory(fields) | ControlBody::Ensemble(fields) => &fields.output_file,
            ControlBody::Concentration(fields) => &fields.output_file,
        }
    }

    pub fn concentration(&self) -> Option<&ConcentrationFields> {
        match &self.body {
            ControlBody::Concentration(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn deposition_active(&self) -> bool {
        self.concentration()
            .is_some_and(ConcentrationFields::deposition_active)
    }

    pub fn time_axis(&self) -> TimeAxis {
        self.header.time_axis()
    }
}
