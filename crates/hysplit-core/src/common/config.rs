//! Pipeline configuration.
//!
//! Every field has a default matching the production deployment, so a JSON
//! file only needs to name what differs.

use super::constants::{
    DEFAULT_CONTOUR_LADDER, DEFAULT_PARALLEL_WORKERS, DEFAULT_QUANTIZATION,
};
use crate::domain::{Direction, PhaseKind, PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Holds the control templates, setup files and the grid description.
    pub template_dir: PathBuf,
    /// Parent of per-simulation working directories and catalog-site data.
    pub data_dir: PathBuf,
    /// Root of the directory-backed persistence store.
    pub store_dir: PathBuf,
    pub parallel_workers: usize,
    /// Parallel launcher; `None` invokes phase commands directly.
    pub launcher: Option<String>,
    pub commands: CommandSet,
    pub templates: TemplateSet,
    pub quantization: u32,
    pub species: Vec<String>,
    pub contour_ladder: Vec<i32>,
    /// Suffix the model appends to the single-trajectory output under the launcher.
    pub rank_suffix: String,
    pub timeout_secs: Option<u64>,
    pub keep_workdir_on_success: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("/home/xcite/hysplit"),
            data_dir: PathBuf::from("/home/xcite/hysplit/conversion_data"),
            store_dir: PathBuf::from("/home/xcite/hysplit/store"),
            parallel_workers: DEFAULT_PARALLEL_WORKERS,
            launcher: Some("mpirun".to_string()),
            commands: CommandSet::default(),
            templates: TemplateSet::default(),
            quantization: DEFAULT_QUANTIZATION,
            species: vec!["PM".to_string(), "TEST".to_string()],
            contour_ladder: DEFAULT_CONTOUR_LADDER.to_vec(),
            rank_suffix: "002".to_string(),
            timeout_secs: None,
            keep_workdir_on_success: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandSet {
    pub single_trajectory: String,
    pub ensemble_trajectory: String,
    pub concentration: String,
    pub grid_converter: String,
    pub topology: String,
}

impl Default for CommandSet {
    fn default() -> Self {
        Self {
            single_trajectory: "hytm_std".to_string(),
            ensemble_trajectory: "hyts_ens".to_string(),
            concentration: "hycm_std".to_string(),
            grid_converter: "conc2cdf".to_string(),
            topology: "geo2topo".to_string(),
        }
    }
}

impl CommandSet {
    pub fn for_phase(&self, phase: PhaseKind) -> &str {
        match phase {
            PhaseKind::SingleTrajectory => &self.single_trajectory,
            PhaseKind::EnsembleTrajectory => &self.ensemble_trajectory,
            PhaseKind::Concentration => &self.concentration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateSet {
    pub single_trajectory: String,
    pub ensemble_trajectory: String,
    pub concentration: String,
    pub trajectory_setup: String,
    pub concentration_setup: String,
    pub grid_description: String,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self {
            single_trajectory: "CONTROL_single_traj".to_string(),
            ensemble_trajectory: "CONTROL_ens_traj".to_string(),
            concentration: "CONTROL_conc".to_string(),
            trajectory_setup: "SETUP.trj.CFG".to_string(),
            concentration_setup: "SETUP.dis.CFG".to_string(),
            grid_description: "ASCDATA.CFG".to_string(),
        }
    }
}

impl TemplateSet {
    /// Template name, which is also the name the bound control is saved under
    /// inside the working directory.
    pub fn control_for_phase(&self, phase: PhaseKind) -> &str {
        match phase {
            PhaseKind::SingleTrajectory => &self.single_trajectory,
            PhaseKind::EnsembleTrajectory => &self.ensemble_trajectory,
            PhaseKind::Concentration => &self.concentration,
        }
    }

    pub fn setup_for_phase(&self, phase: PhaseKind) -> &str {
        match phase {
            PhaseKind::SingleTrajectory | PhaseKind::EnsembleTrajectory => {
                &self.trajectory_setup
            }
            PhaseKind::Concentration => &self.concentration_setup,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| {
            PipelineError::io_system(
                "IO.CONFIG_READ",
                format!("failed to read configuration '{}': {}", path.display(), source),
            )
        })?;
        let config = serde_json::from_str::<Self>(&content).map_err(|source| {
            PipelineError::input_validation(
                "INPUT.CONFIG_PARSE",
                format!("failed to parse configuration '{}': {}", path.display(), source),
            )
        })?;
        let config = config.relative_to(path.parent().unwrap_or_else(|| Path::new("")));
        config.validate()?;
        Ok(config)
    }

    /// Anchors relative directories at `base`, the directory holding the
    /// configuration file.
    pub fn relative_to(mut self, base: &Path) -> Self {
        for dir in [&mut self.template_dir, &mut self.data_dir, &mut self.store_dir] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        self
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.parallel_workers == 0 {
            return Err(PipelineError::input_validation(
                "INPUT.CONFIG_WORKERS",
                "parallelWorkers must be at least 1",
            ));
        }
        if self.quantization == 0 {
            return Err(PipelineError::input_validation(
                "INPUT.CONFIG_QUANTIZATION",
                "quantization must be positive",
            ));
        }
        if self.contour_ladder.len() < 2
            || !self
                .contour_ladder
                .windows(2)
                .all(|pair| pair[0] < pair[1])
        {
            return Err(PipelineError::input_validation(
                "INPUT.CONFIG_LADDER",
                format!(
                    "contourLadder must hold at least two strictly ascending boundaries, got {:?}",
                    self.contour_ladder
                ),
            ));
        }
        if self.species.is_empty() {
            return Err(PipelineError::input_validation(
                "INPUT.CONFIG_SPECIES",
                "species must name at least one concentration variable",
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn simulation_dir(&self, simulation_id: &str) -> PathBuf {
        self.data_dir.join(simulation_id)
    }

    pub fn working_dir(&self, simulation_id: &str, direction: Direction) -> PathBuf {
        self.simulation_dir(simulation_id).join(direction.as_str())
    }
}
