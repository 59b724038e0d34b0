//! Post-processing for predefined sites whose model runs happen outside the
//! pipeline and leave their controls and outputs in the shared data
//! directory.

use super::postprocess::{PostProcessInputs, PostProcessSummary, post_process};
use super::workdir::clear_artifacts;
use crate::common::PipelineConfig;
use crate::control::{ControlRecord, read_control_file};
use crate::domain::{Direction, PhaseKind, PipelineError, PipelineResult};
use crate::persistence::PersistenceGateway;
use crate::quantize::TopologyQuantizer;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, info_span};

const ARTIFACT_PATTERNS: [&str; 2] = ["height*_time*.geojson", "height*_time*.json"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSite {
    pub site: String,
    pub direction: Direction,
}

impl CatalogSite {
    pub fn new(site: impl Into<String>, direction: Direction) -> Self {
        Self {
            site: site.into(),
            direction,
        }
    }

    /// Control number of each phase in the shared directory.
    pub const fn control_id(&self, phase: PhaseKind) -> &'static str {
        match (self.direction, phase) {
            (Direction::Forward, PhaseKind::SingleTrajectory) => "001",
            (Direction::Forward, PhaseKind::EnsembleTrajectory) => "005",
            (Direction::Forward, PhaseKind::Concentration) => "010",
            (Direction::Backward, PhaseKind::SingleTrajectory) => "002",
            (Direction::Backward, PhaseKind::EnsembleTrajectory) => "006",
            (Direction::Backward, PhaseKind::Concentration) => "011",
        }
    }

    pub fn control_path(&self, data_dir: &Path, phase: PhaseKind) -> PathBuf {
        data_dir.join(format!("CONTROL.{}_{}", self.control_id(phase), self.site))
    }

    pub fn single_output(&self, data_dir: &Path, control: &ControlRecord) -> PathBuf {
        data_dir.join(format!("{}_{}", control.output_file(), self.direction))
    }

    pub fn ensemble_output(&self, data_dir: &Path, control: &ControlRecord) -> PathBuf {
        data_dir.join(format!("{}_{}_ens", control.output_file(), self.direction))
    }

    pub fn dataset(&self, data_dir: &Path, control: &ControlRecord) -> PathBuf {
        data_dir.join(format!("{}_{}.ncf", control.output_file(), self.direction))
    }

    pub fn artifact_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.site).join(self.direction.as_str())
    }

    pub fn default_simulation_id(&self) -> String {
        format!("{}_{}", self.site, self.direction)
    }
}

/// Contours and metadata for a catalog site. Artifacts from an earlier pass
/// are removed from the site's output folder first.
pub fn postprocess_catalog_site<G, Q>(
    config: &PipelineConfig,
    site: &CatalogSite,
    simulation_id: &str,
    gateway: &G,
    quantizer: &Q,
) -> PipelineResult<PostProcessSummary>
where
    G: PersistenceGateway + ?Sized,
    Q: TopologyQuantizer + ?Sized,
{
    let span = info_span!("catalog", site = %site.site, direction = %site.direction);
    let _entered = span.enter();

    let data_dir = &config.data_dir;
    let single = read_control_file(
        &site.control_path(data_dir, PhaseKind::SingleTrajectory),
        PhaseKind::SingleTrajectory,
    )?;
    let ensemble = read_control_file(
        &site.control_path(data_dir, PhaseKind::EnsembleTrajectory),
        PhaseKind::EnsembleTrajectory,
    )?;
    let concentration = read_control_file(
        &site.control_path(data_dir, PhaseKind::Concentration),
        PhaseKind::Concentration,
    )?;
    if concentration.direction() != site.direction {
        return Err(PipelineError::input_validation(
            "INPUT.CATALOG_DIRECTION",
            format!(
                "concentration control for site '{}' runs {} but {} was requested",
                site.site,
                concentration.direction(),
                site.direction
            ),
        ));
    }

    let artifact_dir = site.artifact_dir(data_dir);
    if artifact_dir.is_dir() {
        let removed = clear_artifacts(&artifact_dir, &ARTIFACT_PATTERNS)?;
        info!(removed, dir = %artifact_dir.display(), "cleared previous artifacts");
    } else {
        fs::create_dir_all(&artifact_dir).map_err(|source| {
            PipelineError::io_system(
                "IO.ARTIFACT_DIR",
                format!("failed to create '{}': {}", artifact_dir.display(), source),
            )
        })?;
    }

    let inputs = PostProcessInputs {
        single_output: site.single_output(data_dir, &single),
        ensemble_output: site.ensemble_output(data_dir, &ensemble),
        dataset: site.dataset(data_dir, &concentration),
        single_control: &single,
        ensemble_control: &ensemble,
        concentration_control: &concentration,
        artifact_dir,
    };
    post_process(simulation_id, &inputs, config, gateway, quantizer)
}
