//! Dispersion-model pipeline: binds control files, drives the external model
//! phases, and turns the concentration grid into contour and metadata
//! documents.

pub mod common;
pub mod contours;
pub mod control;
pub mod dataset;
pub mod domain;
pub mod geometry;
pub mod metadata;
pub mod numerics;
pub mod orchestrator;
pub mod persistence;
pub mod quantize;
pub mod runner;
pub mod serialization;
pub mod trajectory;

#[cfg(all(test, unix))]
mod test_support;

pub use common::PipelineConfig;
pub use domain::{
    Direction, PhaseKind, PipelineError, PipelineErrorCategory, PipelineResult, RunParameters,
    SimulationRequest,
};
pub use orchestrator::{DirectionOutcome, RunReport, run_directions, run_simulation};
pub use persistence::{DirectoryStore, MemoryStore, PersistenceGateway};
pub use quantize::{ExternalQuantizer, TopologyQuantizer};
