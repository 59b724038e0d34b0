mod process;

pub use process::{ExternalCommand, execute};

use crate::common::PipelineConfig;
use crate::common::constants::SENTINEL_EXIT_STATUS;
use crate::domain::{PhaseKind, PipelineError, PipelineResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The setup file name every phase reads from its working directory.
pub const SETUP_FILE_NAME: &str = "SETUP.CFG";

/// What a finished external invocation means to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    Success,
    /// The model stopped on its internal fatal code.
    SimulationFailed,
    /// Any other unsuccessful exit; `None` when no exit code was reported.
    ExternalError(Option<i32>),
}

impl PhaseOutcome {
    /// Maps a raw exit code. Zero is success with no look at stdout, the
    /// truncated fatal code is a simulation failure, everything else passes
    /// through unchanged.
    pub const fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::Success,
            Some(SENTINEL_EXIT_STATUS) => Self::SimulationFailed,
            other => Self::ExternalError(other),
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn into_result(self, label: &str) -> PipelineResult<()> {
        match self {
            Self::Success => Ok(()),
            Self::SimulationFailed => Err(PipelineError::simulation_failed(
                "RUN.SIMULATION_FAILED",
                format!(
                    "HYSPLIT simulation failed during {} (exit status {})",
                    label, SENTINEL_EXIT_STATUS
                ),
            )),
            Self::ExternalError(code) => {
                let status_text = code.map_or_else(
                    || "terminated by signal".to_string(),
                    |code| format!("exit code {}", code),
                );
                Err(PipelineError::external_process(
                    "RUN.PHASE_EXIT",
                    code,
                    format!("{} failed with {}", label, status_text),
                ))
            }
        }
    }
}

/// Launches model phases and the grid converter inside one working directory.
#[derive(Debug, Clone, Copy)]
pub struct PhaseRunner<'a> {
    config: &'a PipelineConfig,
}

impl<'a> PhaseRunner<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn command_for(&self, phase: PhaseKind) -> ExternalCommand {
        let command = ExternalCommand::new(self.config.commands.for_phase(phase));
        match (&self.config.launcher, phase.is_parallel()) {
            (Some(launcher), true) => {
                command.under_launcher(launcher, self.config.parallel_workers)
            }
            _ => command,
        }
    }

    /// Copies the phase's setup file in, then runs the phase command to
    /// completion. The control file must already be in place.
    pub fn run_phase(&self, working_dir: &Path, phase: PhaseKind) -> PipelineResult<PhaseOutcome> {
        self.stage_setup_file(working_dir, phase)?;
        let command = self.command_for(phase);
        info!(%phase, command = %command.display_line(), "running phase");
        let code = execute(&command, working_dir, self.config.timeout())?;
        let outcome = PhaseOutcome::from_exit_code(code);
        debug!(%phase, ?outcome, "phase finished");
        Ok(outcome)
    }

    /// Converts the raw concentration grid into the self-describing dataset
    /// and returns its path.
    pub fn convert_grid(&self, working_dir: &Path, raw_output: &str) -> PipelineResult<PathBuf> {
        let dataset_name = format!("{raw_output}.nc");
        let command = ExternalCommand::new(&self.config.commands.grid_converter)
            .arg(format!("-i{raw_output}"))
            .arg(format!("-o{dataset_name}"));
        info!(command = %command.display_line(), "converting concentration grid");
        let code = execute(&command, working_dir, self.config.timeout())?;
        PhaseOutcome::from_exit_code(code).into_result("grid conversion")?;

        let dataset_path = working_dir.join(dataset_name);
        if !dataset_path.is_file() {
            return Err(PipelineError::external_process(
                "RUN.CONVERTER_OUTPUT",
                Some(0),
                format!(
                    "grid converter reported success but '{}' was not written",
                    dataset_path.display()
                ),
            ));
        }
        Ok(dataset_path)
    }

    fn stage_setup_file(&self, working_dir: &Path, phase: PhaseKind) -> PipelineResult<()> {
        let source = self
            .config
            .template_dir
            .join(self.config.templates.setup_for_phase(phase));
        let destination = working_dir.join(SETUP_FILE_NAME);
        copy_file(&source, &destination)
    }
}

pub fn copy_file(source: &Path, destination: &Path) -> PipelineResult<()> {
    debug!(from = %source.display(), to = %destination.display(), "copying");
    fs::copy(source, destination).map(|_| ()).map_err(|error| {
        PipelineError::io_system(
            "IO.COPY",
            format!(
                "failed to copy '{}' to '{}': {}",
                source.display(),
                destination.display(),
                error
            ),
        )
    })
}
