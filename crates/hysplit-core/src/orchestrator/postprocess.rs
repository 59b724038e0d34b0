use crate::common::PipelineConfig;
use crate::contours::ContourExtractor;
use crate::control::ControlRecord;
use crate::dataset::ConcentrationField;
use crate::domain::{PipelineError, PipelineResult};
use crate::metadata::{self, MetadataSources, SimulationMetadata};
use crate::persistence::PersistenceGateway;
use crate::quantize::TopologyQuantizer;
use crate::serialization::write_text_artifact;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything post-processing reads. Paths are resolved by the caller, which
/// knows the layout of ad-hoc and catalog runs.
pub struct PostProcessInputs<'a> {
    pub single_control: &'a ControlRecord,
    pub ensemble_control: &'a ControlRecord,
    pub concentration_control: &'a ControlRecord,
    pub single_output: PathBuf,
    pub ensemble_output: PathBuf,
    pub dataset: PathBuf,
    /// Receives the GeoJSON and topology files.
    pub artifact_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessSummary {
    pub contours: usize,
    pub skipped: usize,
    pub metadata: SimulationMetadata,
}

struct StagedContour {
    height_index: usize,
    time_index: usize,
    topology: String,
}

/// Contours every slice, quantizes each collection, assembles metadata and
/// only then writes everything through `gateway`.
pub fn post_process<G, Q>(
    simulation_id: &str,
    inputs: &PostProcessInputs<'_>,
    config: &PipelineConfig,
    gateway: &G,
    quantizer: &Q,
) -> PipelineResult<PostProcessSummary>
where
    G: PersistenceGateway + ?Sized,
    Q: TopologyQuantizer + ?Sized,
{
    let direction = inputs.concentration_control.direction();
    let field = ConcentrationField::load(
        &inputs.dataset,
        &config.species,
        inputs.concentration_control.deposition_active(),
    )?;
    let contour_set = ContourExtractor::new(&config.contour_ladder).extract(&field, direction)?;

    let mut staged = Vec::with_capacity(contour_set.artifacts.len());
    for artifact in &contour_set.artifacts {
        let stem = artifact.file_stem();
        let geojson_path = inputs.artifact_dir.join(format!("{stem}.geojson"));
        let topology_path = inputs.artifact_dir.join(format!("{stem}.json"));
        let geojson = serde_json::to_string(&artifact.collection).map_err(|source| {
            PipelineError::internal(
                "SYS.GEOJSON_ENCODE",
                format!("failed to encode contours {stem}: {source}"),
            )
        })?;
        write_artifact(&geojson_path, &geojson)?;
        staged.push(StagedContour {
            height_index: artifact.height_index,
            time_index: artifact.time_index,
            topology: quantizer.quantize(&geojson_path, &topology_path)?,
        });
    }

    let metadata = metadata::assemble(&MetadataSources {
        single_control: inputs.single_control,
        single_output: &inputs.single_output,
        ensemble_control: inputs.ensemble_control,
        ensemble_output: &inputs.ensemble_output,
        concentration_control: inputs.concentration_control,
        heights: field.levels(),
        time_count: field.time_count(),
        ladder: &config.contour_ladder,
    })?;
    drop(field);

    for contour in &staged {
        gateway.upsert_contour(
            simulation_id,
            contour.height_index,
            contour.time_index,
            &contour.topology,
        )?;
    }
    gateway.store_metadata(simulation_id, &metadata)?;

    info!(
        simulation_id,
        contours = staged.len(),
        skipped = contour_set.skipped,
        "post-processing stored"
    );
    Ok(PostProcessSummary {
        contours: staged.len(),
        skipped: contour_set.skipped,
        metadata,
    })
}

fn write_artifact(path: &Path, content: &str) -> PipelineResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| {
            PipelineError::io_system(
                "IO.ARTIFACT_WRITE",
                format!("failed to create '{}': {}", parent.display(), source),
            )
        })?;
    }
    write_text_artifact(path, content).map_err(|source| {
        PipelineError::io_system(
            "IO.ARTIFACT_WRITE",
            format!("failed to write '{}': {}", path.display(), source),
        )
    })
}
