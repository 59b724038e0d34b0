//! Trajectory endpoint files and their GeoJSON rendering.

use crate::common::constants::{
    ENSEMBLE_TRAJECTORY_HEADER_LINES, SINGLE_TRAJECTORY_HEADER_LINES, TRAJECTORY_COLUMN_WIDTHS,
    TRAJECTORY_COLUMN_HEIGHT, TRAJECTORY_COLUMN_ID, TRAJECTORY_COLUMN_LATITUDE,
    TRAJECTORY_COLUMN_LONGITUDE,
};
use crate::domain::{PipelineError, PipelineResult};
use crate::geometry::{Feature, FeatureCollection, Geometry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoint {
    pub trajectory_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryProperties {
    pub times: Vec<String>,
    pub heights: Vec<f64>,
}

pub type TrajectoryFeature = Feature<TrajectoryProperties>;
pub type TrajectoryCollection = FeatureCollection<TrajectoryProperties>;

/// Parses fixed-width endpoint rows after `header_lines` lines. Blank lines
/// are ignored.
pub fn parse_endpoints(source: &str, header_lines: usize) -> PipelineResult<Vec<Endpoint>> {
    source
        .lines()
        .enumerate()
        .skip(header_lines)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_row(line, index + 1))
        .collect()
}

fn parse_row(line: &str, line_number: usize) -> PipelineResult<Endpoint> {
    let column = |wanted: usize| -> PipelineResult<f64> {
        let start = TRAJECTORY_COLUMN_WIDTHS[..wanted].iter().sum::<usize>();
        let end = start + TRAJECTORY_COLUMN_WIDTHS[wanted];
        let text = line
            .get(start..end.min(line.len()))
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                PipelineError::io_system(
                    "IO.TRAJECTORY_ROW",
                    format!("trajectory line {line_number} has no column {wanted}"),
                )
            })?;
        text.parse::<f64>().map_err(|_| {
            PipelineError::io_system(
                "IO.TRAJECTORY_ROW",
                format!("trajectory line {line_number} column {wanted} is not numeric: '{text}'"),
            )
        })
    };
    Ok(Endpoint {
        trajectory_id: column(TRAJECTORY_COLUMN_ID)? as i64,
        latitude: column(TRAJECTORY_COLUMN_LATITUDE)?,
        longitude: column(TRAJECTORY_COLUMN_LONGITUDE)?,
        height: column(TRAJECTORY_COLUMN_HEIGHT)?,
    })
}

/// A LineString of `[lon, lat, height]` carrying the run's time stamps.
pub fn trajectory_feature(endpoints: &[Endpoint], times: &[String]) -> TrajectoryFeature {
    Feature {
        geometry: Geometry::LineString {
            coordinates: endpoints
                .iter()
                .map(|point| [point.longitude, point.latitude, point.height])
                .collect(),
        },
        properties: TrajectoryProperties {
            times: times.to_vec(),
            heights: endpoints.iter().map(|point| point.height).collect(),
        },
    }
}

/// One feature per trajectory id, in order of first appearance.
pub fn ensemble_collection(endpoints: &[Endpoint], times: &[String]) -> TrajectoryCollection {
    let mut groups: Vec<(i64, Vec<Endpoint>)> = Vec::new();
    for point in endpoints {
        match groups.iter_mut().find(|(id, _)| *id == point.trajectory_id) {
            Some((_, members)) => members.push(*point),
            None => groups.push((point.trajectory_id, vec![*point])),
        }
    }
    FeatureCollection::new(
        groups
            .iter()
            .map(|(_, members)| trajectory_feature(members, times))
            .collect(),
    )
}

pub fn read_single(path: &Path, times: &[String]) -> PipelineResult<TrajectoryFeature> {
    let endpoints = parse_endpoints(&read_endpoint_file(path)?, SINGLE_TRAJECTORY_HEADER_LINES)?;
    Ok(trajectory_feature(&endpoints, times))
}

pub fn read_ensemble(path: &Path, times: &[String]) -> PipelineResult<TrajectoryCollection> {
    let endpoints = parse_endpoints(&read_endpoint_file(path)?, ENSEMBLE_TRAJECTORY_HEADER_LINES)?;
    Ok(ensemble_collection(&endpoints, times))
}

fn read_endpoint_file(path: &Path) -> PipelineResult<String> {
    fs::read_to_string(path).map_err(|source| {
        PipelineError::io_system(
            "IO.TRAJECTORY_READ",
            format!("failed to read trajectory file '{}': {}", path.display(), source),
        )
    })
}
