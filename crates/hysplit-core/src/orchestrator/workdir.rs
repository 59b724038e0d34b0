use crate::domain::{PipelineError, PipelineResult};
use crate::runner::copy_file;
use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory owned by one direction run. Phase commands execute with it as
/// their current directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectory {
    path: PathBuf,
}

impl WorkingDirectory {
    /// Creates the directory, clearing leftovers of an earlier attempt.
    pub fn create(path: PathBuf) -> PipelineResult<Self> {
        if path.exists() {
            debug!(path = %path.display(), "removing stale working directory");
            fs::remove_dir_all(&path).map_err(|source| io_error("IO.WORKDIR_CLEAR", &path, source))?;
        }
        fs::create_dir_all(&path).map_err(|source| io_error("IO.WORKDIR_CREATE", &path, source))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn stage(&self, source: &Path, name: &str) -> PipelineResult<PathBuf> {
        let destination = self.join(name);
        copy_file(source, &destination)?;
        Ok(destination)
    }

    /// Deletes the directory, and its parent when nothing else is left in it.
    pub fn remove(self) -> PipelineResult<()> {
        fs::remove_dir_all(&self.path)
            .map_err(|source| io_error("IO.WORKDIR_REMOVE", &self.path, source))?;
        if let Some(parent) = self.path.parent() {
            let _ = fs::remove_dir(parent);
        }
        Ok(())
    }
}

fn io_error(placeholder: &'static str, path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::io_system(
        placeholder,
        format!("working directory '{}': {}", path.display(), source),
    )
}

fn glob_matcher(pattern: &str) -> PipelineResult<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| {
            PipelineError::internal("SYS.GLOB", format!("invalid pattern '{pattern}': {source}"))
        })
}

fn matching_files(dir: &Path, matches: impl Fn(&str) -> bool) -> PipelineResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| io_error("IO.WORKDIR_LIST", dir, source))?;
    let mut found = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .filter(|entry| entry.file_name().to_str().is_some_and(&matches))
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    found.sort();
    Ok(found)
}

/// Puts the single-trajectory output back under its configured name. Under
/// the parallel launcher the model writes `<output>.<rank>` instead; the
/// configured rank suffix is tried first, then any three-digit suffix, and a
/// file already at the canonical name is accepted as is.
pub fn restore_canonical_output(dir: &Path, output: &str, rank_suffix: &str) -> PipelineResult<PathBuf> {
    let canonical = dir.join(output);
    let expected = dir.join(format!("{output}.{rank_suffix}"));
    if expected.is_file() {
        copy_file(&expected, &canonical)?;
        return Ok(canonical);
    }

    let matcher = glob_matcher(&format!("{output}.[0-9][0-9][0-9]"))?;
    let candidates = matching_files(dir, |name| matcher.is_match(name))?;
    if let Some(found) = candidates.first() {
        warn!(
            expected = %expected.display(),
            found = %found.display(),
            "rank-suffixed output differs from configured suffix"
        );
        copy_file(found, &canonical)?;
        return Ok(canonical);
    }

    if canonical.is_file() {
        debug!(path = %canonical.display(), "output already at canonical name");
        return Ok(canonical);
    }
    Err(PipelineError::external_process(
        "RUN.TRAJECTORY_OUTPUT",
        Some(0),
        format!(
            "single trajectory output '{}' was not produced (looked for '{}')",
            output,
            expected.display()
        ),
    ))
}

/// Removes files left in `dir` by an earlier post-processing pass.
pub fn clear_artifacts(dir: &Path, patterns: &[&str]) -> PipelineResult<usize> {
    let set = artifact_globs(patterns)?;
    let stale = matching_files(dir, |name| set.is_match(name))?;
    for path in &stale {
        fs::remove_file(path).map_err(|source| io_error("IO.ARTIFACT_REMOVE", path, source))?;
    }
    Ok(stale.len())
}

fn artifact_globs(patterns: &[&str]) -> PipelineResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|source| {
            PipelineError::internal("SYS.GLOB", format!("invalid pattern '{pattern}': {source}"))
        })?);
    }
    builder
        .build()
        .map_err(|source| PipelineError::internal("SYS.GLOB", source.to_string()))
}
