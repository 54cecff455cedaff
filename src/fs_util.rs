use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::IcevelError;

/// Scoped ownership of an intermediate file path. The file is removed when
/// the guard is dropped, on success and failure alike; a path that was
/// never created, or was renamed away, is not an error.
#[derive(Debug)]
pub struct TempGuard {
    path: Utf8PathBuf,
}

impl TempGuard {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(self.path.as_std_path()) {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!("failed to remove temporary file {}: {err}", self.path);
            }
        }
    }
}

/// Sibling path used to stage an artifact before atomic publication,
/// e.g. `out.nc` -> `out.nc.part`.
pub fn staging_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut name = path.as_str().to_string();
    name.push_str(".part");
    Utf8PathBuf::from(name)
}

/// Atomically publishes a fully written staging file under its final name.
pub fn publish(staged: &Utf8Path, dest: &Utf8Path) -> Result<(), IcevelError> {
    fs::rename(staged.as_std_path(), dest.as_std_path())
        .map_err(|err| IcevelError::Filesystem(format!("publish {dest}: {err}")))
}

pub fn ensure_dir(dir: &Utf8Path) -> Result<(), IcevelError> {
    fs::create_dir_all(dir.as_std_path())
        .map_err(|err| IcevelError::Filesystem(format!("create {dir}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_guard_removes_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("scratch.nc")).unwrap();
        std::fs::write(path.as_std_path(), b"partial").unwrap();
        {
            let _guard = TempGuard::new(path.clone());
        }
        assert!(!path.as_std_path().exists());
    }

    #[test]
    fn temp_guard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("never-created.nc")).unwrap();
        let _guard = TempGuard::new(path);
    }

    #[test]
    fn staging_path_appends_suffix() {
        let path = Utf8Path::new("/out/TSX_W69.10N_vx_merged.nc");
        assert_eq!(
            staging_path(path),
            Utf8PathBuf::from("/out/TSX_W69.10N_vx_merged.nc.part")
        );
    }

    #[test]
    fn publish_renames_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = Utf8PathBuf::from_path_buf(dir.path().join("a.nc.part")).unwrap();
        let dest = Utf8PathBuf::from_path_buf(dir.path().join("a.nc")).unwrap();
        std::fs::write(staged.as_std_path(), b"done").unwrap();
        publish(&staged, &dest).unwrap();
        assert!(dest.as_std_path().exists());
        assert!(!staged.as_std_path().exists());
    }
}
