//! Where finished simulations are stored.

use crate::domain::{PipelineError, PipelineResult};
use crate::metadata::SimulationMetadata;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

/// Keyed storage for topology documents and metadata. Writes to the same key
/// replace the previous value.
pub trait PersistenceGateway {
    fn upsert_contour(
        &self,
        simulation_id: &str,
        height_index: usize,
        time_index: usize,
        topology: &str,
    ) -> PipelineResult<()>;

    fn store_metadata(&self, simulation_id: &str, metadata: &SimulationMetadata) -> PipelineResult<()>;

    fn contour(
        &self,
        simulation_id: &str,
        height_index: usize,
        time_index: usize,
    ) -> PipelineResult<Option<String>>;

    fn metadata(&self, simulation_id: &str) -> PipelineResult<Option<String>>;
}

fn metadata_json(simulation_id: &str, metadata: &SimulationMetadata) -> PipelineResult<String> {
    serde_json::to_string(metadata).map_err(|source| {
        PipelineError::internal(
            "SYS.METADATA_ENCODE",
            format!("failed to encode metadata for '{simulation_id}': {source}"),
        )
    })
}

/// File-per-key store under `<root>/<simulation id>/`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn contour_path(&self, simulation_id: &str, height_index: usize, time_index: usize) -> PathBuf {
        self.root
            .join(simulation_id)
            .join("contours")
            .join(format!("height{height_index}_time{time_index}.json"))
    }

    fn metadata_path(&self, simulation_id: &str) -> PathBuf {
        self.root.join(simulation_id).join("metadata.json")
    }

    /// Writes beside the target and renames over it.
    fn replace(&self, path: &Path, content: &str) -> PipelineResult<()> {
        let store_error = |action: &str, detail: String| {
            PipelineError::persistence(
                "STORE.WRITE",
                format!("failed to {} '{}': {}", action, path.display(), detail),
            )
        };
        let parent = path
            .parent()
            .ok_or_else(|| store_error("resolve parent of", "no parent directory".to_string()))?;
        fs::create_dir_all(parent)
            .map_err(|source| store_error("create directory for", source.to_string()))?;
        let mut staged = NamedTempFile::new_in(parent)
            .map_err(|source| store_error("stage", source.to_string()))?;
        staged
            .write_all(content.as_bytes())
            .map_err(|source| store_error("write", source.to_string()))?;
        staged
            .persist(path)
            .map_err(|source| store_error("replace", source.error.to_string()))?;
        debug!(path = %path.display(), bytes = content.len(), "stored document");
        Ok(())
    }

    fn load(path: &Path) -> PipelineResult<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PipelineError::persistence(
                "STORE.READ",
                format!("failed to read '{}': {}", path.display(), source),
            )),
        }
    }
}

impl PersistenceGateway for DirectoryStore {
    fn upsert_contour(
        &self,
        simulation_id: &str,
        height_index: usize,
        time_index: usize,
        topology: &str,
    ) -> PipelineResult<()> {
        self.replace(
            &self.contour_path(simulation_id, height_index, time_index),
            topology,
        )
    }

    fn store_metadata(&self, simulation_id: &str, metadata: &SimulationMetadata) -> PipelineResult<()> {
        let json = metadata_json(simulation_id, metadata)?;
        self.replace(&self.metadata_path(simulation_id), &json)
    }

    fn contour(
        &self,
        simulation_id: &str,
        height_index: usize,
        time_index: usize,
    ) -> PipelineResult<Option<String>> {
        Self::load(&self.contour_path(simulation_id, height_index, time_index))
    }

    fn metadata(&self, simulation_id: &str) -> PipelineResult<Option<String>> {
        Self::load(&self.metadata_path(simulation_id))
    }
}

type ContourKey = (String, usize, usize);

/// In-process store, mostly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    contours: Mutex<BTreeMap<ContourKey, String>>,
    metadata: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contour_count(&self) -> usize {
        self.contours.lock().map_or(0, |contours| contours.len())
    }

    pub fn contour_keys(&self, simulation_id: &str) -> Vec<(usize, usize)> {
        self.contours.lock().map_or_else(
            |_| Vec::new(),
            |contours| {
                contours
                    .keys()
                    .filter(|(id, _, _)| id == simulation_id)
                    .map(|(_, height, time)| (*height, *time))
                    .collect()
            },
        )
    }
}

fn poisoned() -> PipelineError {
    PipelineError::internal("SYS.STORE_LOCK", "in-memory store lock was poisoned")
}

impl PersistenceGateway for MemoryStore {
    fn upsert_contour(
        &self,
        simulation_id: &str,
        height_index: usize,
        time_index: usize,
        topology: &str,
    ) -> PipelineResult<()> {
        self.contours.lock().map_err(|_| poisoned())?.insert(
            (simulation_id.to_string(), height_index, time_index),
            topology.to_string(),
        );
        Ok(())
    }

    fn store_metadata(&self, simulation_id: &str, metadata: &SimulationMetadata) -> PipelineResult<()> {
        let json = metadata_json(simulation_id, metadata)?;
        self.metadata
            .lock()
            .map_err(|_| poisoned())?
            .insert(simulation_id.to_string(), json);
        Ok(())
    }

    fn contour(
        &self,
        simulation_id: &str,
        height_index: usize,
        time_index: usize,
    ) -> PipelineResult<Option<String>> {
        Ok(self
            .contours
            .lock()
            .map_err(|_| poisoned())?
            .get(&(simulation_id.to_string(), height_index, time_index))
            .cloned())
    }

    fn metadata(&self, simulation_id: &str) -> PipelineResult<Option<String>> {
        Ok(self
            .metadata
            .lock()
            .map_err(|_| poisoned())?
            .get(simulation_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::{DirectoryStore, MemoryStore, PersistenceGateway};
    use tempfile::TempDir;

    #[test]
    fn directory_store_upserts_in_place() {
        let temp = TempDir::new().expect("tempdir should be created");
        let store = DirectoryStore::new(temp.path());

        store
            .upsert_contour("sim_fwd", 0, 2, r#"{"type":"Topology","v":1}"#)
            .expect("first write");
        store
            .upsert_contour("sim_fwd", 0, 2, r#"{"type":"Topology","v":2}"#)
            .expect("second write");

        assert!(temp.path().join("sim_fwd/contours/height0_time2.json").is_file());
        assert_eq!(
            store.contour("sim_fwd", 0, 2).expect("read").as_deref(),
            Some(r#"{"type":"Topology","v":2}"#)
        );
        assert_eq!(store.contour("sim_fwd", 1, 0).expect("read"), None);
        assert_eq!(store.metadata("sim_fwd").expect("read"), None);
    }

    #[test]
    fn memory_store_keys_by_simulation() {
        let store = MemoryStore::new();
        store.upsert_contour("a", 0, 0, "{}").expect("write");
        store.upsert_contour("a", 1, 3, "{}").expect("write");
        store.upsert_contour("b", 0, 0, "{}").expect("write");
        store.upsert_contour("a", 1, 3, "{\"v\":2}").expect("overwrite");

        assert_eq!(store.contour_count(), 3);
        assert_eq!(store.contour_keys("a"), vec![(0, 0), (1, 3)]);
        assert_eq!(
            store.contour("a", 1, 3).expect("read").as_deref(),
            Some("{\"v\":2}")
        );
    }
}
