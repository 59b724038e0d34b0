//! Drives one direction of a simulation through its phases.

pub mod catalog;
mod postprocess;
mod workdir;

pub use catalog::{CatalogSite, postprocess_catalog_site};
pub use postprocess::{PostProcessInputs, PostProcessSummary, post_process};
pub use workdir::{WorkingDirectory, clear_artifacts, restore_canonical_output};

use crate::common::PipelineConfig;
use crate::control::{ControlRecord, bind, read_control_file, write_control_file};
use crate::domain::{
    Direction, PhaseKind, PipelineError, PipelineResult, RunParameters, SimulationRequest,
};
use crate::persistence::PersistenceGateway;
use crate::quantize::TopologyQuantizer;
use crate::runner::PhaseRunner;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn};

/// Name every phase reads its control from.
pub const CONTROL_FILE_NAME: &str = "CONTROL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    SingleTrajectory,
    EnsembleTrajectory,
    Concentration,
    PostProcess,
    Done,
    Failed,
}

impl RunState {
    /// Successor after the work of `self` succeeds. Terminal states map to
    /// themselves.
    pub const fn next(self) -> Self {
        match self {
            Self::Init => Self::SingleTrajectory,
            Self::SingleTrajectory => Self::EnsembleTrajectory,
            Self::EnsembleTrajectory => Self::Concentration,
            Self::Concentration => Self::PostProcess,
            Self::PostProcess | Self::Done => Self::Done,
            Self::Failed => Self::Failed,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::SingleTrajectory => "SINGLE_TRAJECTORY",
            Self::EnsembleTrajectory => "ENSEMBLE_TRAJECTORY",
            Self::Concentration => "CONCENTRATION",
            Self::PostProcess => "POST_PROCESS",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }
}

impl Display for RunState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub simulation_id: String,
    pub direction: Direction,
    pub elapsed: Duration,
    pub contours: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
struct BoundControls {
    single: ControlRecord,
    ensemble: ControlRecord,
    concentration: ControlRecord,
}

impl BoundControls {
    fn for_phase(&self, phase: PhaseKind) -> &ControlRecord {
        match phase {
            PhaseKind::SingleTrajectory => &self.single,
            PhaseKind::EnsembleTrajectory => &self.ensemble,
            PhaseKind::Concentration => &self.concentration,
        }
    }
}

/// One direction run. Each call to [`SimulationRun::step`] performs the work
/// of the current state and advances; an error moves the run to `Failed`
/// and leaves the working directory in place.
pub struct SimulationRun<'a, G: ?Sized, Q: ?Sized> {
    config: &'a PipelineConfig,
    request: &'a SimulationRequest,
    gateway: &'a G,
    quantizer: &'a Q,
    state: RunState,
    workdir: Option<WorkingDirectory>,
    controls: Option<BoundControls>,
    dataset: Option<PathBuf>,
    summary: Option<PostProcessSummary>,
}

impl<'a, G, Q> SimulationRun<'a, G, Q>
where
    G: PersistenceGateway + ?Sized,
    Q: TopologyQuantizer + ?Sized,
{
    pub fn new(
        config: &'a PipelineConfig,
        request: &'a SimulationRequest,
        gateway: &'a G,
        quantizer: &'a Q,
    ) -> Self {
        Self {
            config,
            request,
            gateway,
            quantizer,
            state: RunState::Init,
            workdir: None,
            controls: None,
            dataset: None,
            summary: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn working_dir(&self) -> Option<&WorkingDirectory> {
        self.workdir.as_ref()
    }

    pub fn step(&mut self) -> PipelineResult<RunState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }
        let outcome = match self.state {
            RunState::Init => self.initialize(),
            RunState::SingleTrajectory => self.single_trajectory(),
            RunState::EnsembleTrajectory => self.run_model_phase(PhaseKind::EnsembleTrajectory),
            RunState::Concentration => self.concentration(),
            RunState::PostProcess => self.post_process(),
            RunState::Done | RunState::Failed => Ok(()),
        };
        match outcome {
            Ok(()) => {
                self.state = self.state.next();
                Ok(self.state)
            }
            Err(error) => {
                warn!(
                    state = %self.state,
                    workdir = ?self.workdir.as_ref().map(WorkingDirectory::path),
                    "{}",
                    error.diagnostic_line()
                );
                self.state = RunState::Failed;
                Err(error)
            }
        }
    }

    /// Steps to a terminal state. On success the working directory is
    /// removed unless configured to be kept.
    pub fn run(mut self) -> PipelineResult<RunReport> {
        let started = Instant::now();
        while !self.state.is_terminal() {
            self.step()?;
        }
        let summary = self.summary.take().ok_or_else(|| {
            PipelineError::internal("SYS.RUN_SUMMARY", "run finished without a summary")
        })?;
        if let Some(workdir) = self.workdir.take() {
            if self.config.keep_workdir_on_success {
                info!(path = %workdir.path().display(), "keeping working directory");
            } else {
                workdir.remove()?;
            }
        }
        let report = RunReport {
            simulation_id: self.request.simulation_id.clone(),
            direction: self.request.direction(),
            elapsed: started.elapsed(),
            contours: summary.contours,
            skipped: summary.skipped,
        };
        info!(
            seconds = report.elapsed.as_secs_f64(),
            contours = report.contours,
            "simulation finished"
        );
        Ok(report)
    }

    fn workdir(&self) -> PipelineResult<&WorkingDirectory> {
        self.workdir
            .as_ref()
            .ok_or_else(|| out_of_order("working directory"))
    }

    fn controls(&self) -> PipelineResult<&BoundControls> {
        self.controls
            .as_ref()
            .ok_or_else(|| out_of_order("bound controls"))
    }

    /// Binds every template before any external process starts, so a bad
    /// template fails the run without side effects beyond the directory.
    fn initialize(&mut self) -> PipelineResult<()> {
        let templates = &self.config.templates;
        let parameters = &self.request.parameters;
        let load = |phase: PhaseKind| -> PipelineResult<ControlRecord> {
            let path = self
                .config
                .template_dir
                .join(templates.control_for_phase(phase));
            Ok(bind(&read_control_file(&path, phase)?, parameters))
        };
        let controls = BoundControls {
            single: load(PhaseKind::SingleTrajectory)?,
            ensemble: load(PhaseKind::EnsembleTrajectory)?,
            concentration: load(PhaseKind::Concentration)?,
        };

        let workdir = WorkingDirectory::create(
            self.config
                .working_dir(&self.request.simulation_id, parameters.direction),
        )?;
        workdir.stage(
            &self.config.template_dir.join(&templates.grid_description),
            &templates.grid_description,
        )?;
        info!(path = %workdir.path().display(), "working directory ready");
        self.controls = Some(controls);
        self.workdir = Some(workdir);
        Ok(())
    }

    fn run_model_phase(&self, phase: PhaseKind) -> PipelineResult<()> {
        let workdir = self.workdir()?;
        let record = self.controls()?.for_phase(phase);
        write_control_file(&workdir.join(CONTROL_FILE_NAME), record)?;
        write_control_file(
            &workdir.join(self.config.templates.control_for_phase(phase)),
            record,
        )?;
        PhaseRunner::new(self.config)
            .run_phase(workdir.path(), phase)?
            .into_result(&phase.to_string())
    }

    fn single_trajectory(&mut self) -> PipelineResult<()> {
        self.run_model_phase(PhaseKind::SingleTrajectory)?;
        let output = self.controls()?.single.output_file().to_string();
        restore_canonical_output(self.workdir()?.path(), &output, &self.config.rank_suffix)?;
        Ok(())
    }

    fn concentration(&mut self) -> PipelineResult<()> {
        self.run_model_phase(PhaseKind::Concentration)?;
        let raw_output = self.controls()?.concentration.output_file().to_string();
        let dataset = PhaseRunner::new(self.config).convert_grid(self.workdir()?.path(), &raw_output)?;
        self.dataset = Some(dataset);
        Ok(())
    }

    fn post_process(&mut self) -> PipelineResult<()> {
        let workdir = self.workdir()?;
        let controls = self.controls()?;
        let dataset = self
            .dataset
            .clone()
            .ok_or_else(|| out_of_order("converted dataset"))?;
        let inputs = PostProcessInputs {
            single_control: &controls.single,
            ensemble_control: &controls.ensemble,
            concentration_control: &controls.concentration,
            single_output: workdir.join(controls.single.output_file()),
            ensemble_output: workdir.join(controls.ensemble.output_file()),
            dataset,
            artifact_dir: workdir.path().to_path_buf(),
        };
        let summary = post_process(
            &self.request.simulation_id,
            &inputs,
            self.config,
            self.gateway,
            self.quantizer,
        )?;
        self.summary = Some(summary);
        Ok(())
    }
}

fn out_of_order(missing: &str) -> PipelineError {
    PipelineError::internal(
        "SYS.RUN_ORDER",
        format!("{missing} is not available in this state"),
    )
}

/// Runs one direction inside its own tracing span.
pub fn run_simulation<G, Q>(
    config: &PipelineConfig,
    request: &SimulationRequest,
    gateway: &G,
    quantizer: &Q,
) -> PipelineResult<RunReport>
where
    G: PersistenceGateway + ?Sized,
    Q: TopologyQuantizer + ?Sized,
{
    let span = info_span!(
        "simulation",
        id = %request.simulation_id,
        direction = %request.direction()
    );
    let _entered = span.enter();
    SimulationRun::new(config, request, gateway, quantizer).run()
}

/// Result of one direction of a multi-direction request.
#[derive(Debug)]
pub struct DirectionOutcome {
    pub simulation_id: String,
    pub direction: Direction,
    pub result: PipelineResult<RunReport>,
}

pub fn direction_simulation_id(base_id: &str, direction: Direction) -> String {
    format!("{base_id}_{direction}")
}

/// Runs each requested direction in turn. A failure in one direction does
/// not stop or affect the others.
pub fn run_directions<G, Q>(
    config: &PipelineConfig,
    base_id: &str,
    parameters: &RunParameters,
    directions: &[Direction],
    gateway: &G,
    quantizer: &Q,
) -> Vec<DirectionOutcome>
where
    G: PersistenceGateway + ?Sized,
    Q: TopologyQuantizer + ?Sized,
{
    directions
        .iter()
        .map(|direction| {
            let simulation_id = direction_simulation_id(base_id, *direction);
            let request = SimulationRequest::new(
                simulation_id.clone(),
                RunParameters {
                    direction: *direction,
                    ..parameters.clone()
                },
            );
            DirectionOutcome {
                simulation_id,
                direction: *direction,
                result: run_simulation(config, &request, gateway, quantizer),
            }
        })
        .collect()
}
