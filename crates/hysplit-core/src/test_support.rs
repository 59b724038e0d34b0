use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Writes an executable `/bin/sh` script standing in for a model binary.
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("script dir should be created");
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("script should be written");
    let mut permissions = fs::metadata(&path)
        .expect("script metadata")
        .permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("script should be executable");
    path
}
