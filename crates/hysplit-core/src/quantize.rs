//! GeoJSON to quantized topology conversion.

use crate::domain::{PipelineError, PipelineResult};
use crate::runner::{ExternalCommand, PhaseOutcome, execute};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub trait TopologyQuantizer {
    /// Converts `geojson` into a topology document at `topology` and returns
    /// its text.
    fn quantize(&self, geojson: &Path, topology: &Path) -> PipelineResult<String>;
}

/// Shells out to a `geo2topo`-compatible tool:
/// `<command> <geojson> -o <topology> -q <quantization>`.
#[derive(Debug, Clone)]
pub struct ExternalQuantizer {
    command: String,
    quantization: u32,
    timeout: Option<Duration>,
}

impl ExternalQuantizer {
    pub fn new(command: impl Into<String>, quantization: u32, timeout: Option<Duration>) -> Self {
        Self {
            command: command.into(),
            quantization,
            timeout,
        }
    }

    pub fn command_line(&self, geojson: &Path, topology: &Path) -> ExternalCommand {
        ExternalCommand::new(&self.command)
            .arg(geojson.display().to_string())
            .arg("-o")
            .arg(topology.display().to_string())
            .arg("-q")
            .arg(self.quantization.to_string())
    }
}

impl TopologyQuantizer for ExternalQuantizer {
    fn quantize(&self, geojson: &Path, topology: &Path) -> PipelineResult<String> {
        let working_dir = geojson
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let command = self.command_line(
            &local_path(geojson, working_dir),
            &local_path(topology, working_dir),
        );
        let code = execute(&command, working_dir, self.timeout)?;
        PhaseOutcome::from_exit_code(code).into_result("topology quantization")?;
        fs::read_to_string(topology).map_err(|source| {
            PipelineError::external_process(
                "RUN.TOPOLOGY_OUTPUT",
                code,
                format!(
                    "topology quantization did not produce '{}': {}",
                    topology.display(),
                    source
                ),
            )
        })
    }
}

/// `path` as seen from inside `working_dir`, where the tool runs.
fn local_path(path: &Path, working_dir: &Path) -> PathBuf {
    match path.strip_prefix(working_dir) {
        Ok(local) if working_dir != Path::new(".") => local.to_path_buf(),
        _ => std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
    }
}
