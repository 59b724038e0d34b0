//! The per-simulation metadata document served next to the contours.

use crate::control::ControlRecord;
use crate::domain::{
    PipelineError, PipelineResult, TimeAxis, format_iso_minute, format_release_time,
};
use crate::trajectory::{self, TrajectoryCollection, TrajectoryFeature};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetadata {
    pub release_time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub release_height: f64,
    pub release_duration: f64,
    /// Concentration time stamps, oldest first.
    pub times: Vec<String>,
    pub heights: Vec<f64>,
    pub trajectory: TrajectoryFeature,
    pub trajectories: TrajectoryCollection,
    pub levels: Vec<i32>,
}

/// Trajectory stamps stay in simulation order so they line up with the
/// endpoint rows.
pub fn trajectory_times(axis: &TimeAxis) -> Vec<String> {
    axis.simulation_order()
        .into_iter()
        .map(format_iso_minute)
        .collect()
}

pub fn concentration_times(axis: &TimeAxis) -> Vec<String> {
    axis.chronological()
        .into_iter()
        .map(format_iso_minute)
        .collect()
}

/// Inputs gathered once all three phases have run.
pub struct MetadataSources<'a> {
    pub single_control: &'a ControlRecord,
    pub single_output: &'a Path,
    pub ensemble_control: &'a ControlRecord,
    pub ensemble_output: &'a Path,
    pub concentration_control: &'a ControlRecord,
    /// Vertical levels kept in the concentration field.
    pub heights: &'a [f64],
    /// Time slices present in the concentration field.
    pub time_count: usize,
    pub ladder: &'a [i32],
}

pub fn assemble(sources: &MetadataSources<'_>) -> PipelineResult<SimulationMetadata> {
    let concentration = sources.concentration_control.concentration().ok_or_else(|| {
        PipelineError::internal(
            "SYS.METADATA_CONTROL",
            "metadata needs the concentration control record",
        )
    })?;
    let header = &sources.concentration_control.header;

    let trajectory = trajectory::read_single(
        sources.single_output,
        &trajectory_times(&sources.single_control.time_axis()),
    )?;
    let trajectories = trajectory::read_ensemble(
        sources.ensemble_output,
        &trajectory_times(&sources.ensemble_control.time_axis()),
    )?;

    let times = concentration_times(&sources.concentration_control.time_axis());
    time_axis_matches(times.len(), sources.time_count);

    Ok(SimulationMetadata {
        release_time: format_release_time(header.start_time),
        latitude: header.latitude,
        longitude: header.longitude,
        release_height: header.height_agl,
        release_duration: concentration.release_duration,
        times,
        heights: sources.heights.to_vec(),
        trajectory,
        trajectories,
        levels: sources.ladder.to_vec(),
    })
}

/// Stamps come from the control record, slices from the dataset; a mismatch
/// means contour time indices and metadata times drift apart.
pub fn time_axis_matches(stamps: usize, slices: usize) -> bool {
    if stamps != slices {
        warn!(
            stamps,
            slices, "concentration time stamps do not match the dataset time slices"
        );
        return false;
    }
    true
}
