use std::fs;
use std::time::SystemTime;

use camino::Utf8Path;

use crate::error::IcevelError;

/// Timestamp-only regeneration oracle.
///
/// Returns `Ok(true)` iff every output exists and the earliest output
/// modification time is strictly newer than the latest input modification
/// time. An empty output list, or any missing output, means the artifact
/// has never been fully built and must be regenerated. A path that exists
/// but cannot be stat'ed is an error: the cache decision cannot be made
/// safely without its timestamp.
///
/// Deliberately not content-addressed: touched-but-unchanged inputs force
/// a rebuild, and clock skew can produce stale hits.
pub fn up_to_date<P: AsRef<Utf8Path>>(inputs: &[P], outputs: &[P]) -> Result<bool, IcevelError> {
    if outputs.is_empty() {
        return Ok(false);
    }

    let mut oldest_output: Option<SystemTime> = None;
    for output in outputs {
        let output = output.as_ref();
        if !output.as_std_path().exists() {
            return Ok(false);
        }
        let mtime = modified(output)?;
        oldest_output = Some(match oldest_output {
            Some(current) => current.min(mtime),
            None => mtime,
        });
    }
    let oldest_output = oldest_output.expect("outputs checked non-empty");

    let mut newest_input: Option<SystemTime> = None;
    for input in inputs {
        let mtime = modified(input.as_ref())?;
        newest_input = Some(match newest_input {
            Some(current) => current.max(mtime),
            None => mtime,
        });
    }

    match newest_input {
        Some(newest_input) => Ok(oldest_output > newest_input),
        None => Ok(true),
    }
}

fn modified(path: &Utf8Path) -> Result<SystemTime, IcevelError> {
    fs::metadata(path.as_std_path())
        .and_then(|meta| meta.modified())
        .map_err(|err| IcevelError::Stat {
            path: path.to_string(),
            message: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use super::*;

    fn touch(dir: &std::path::Path, name: &str) -> Utf8PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, name).unwrap();
        Utf8PathBuf::from_path_buf(path).unwrap()
    }

    #[test]
    fn newer_output_is_up_to_date() {
        let dir = tempfile::tempdir().unwrap();
        let input = touch(dir.path(), "input.tif");
        sleep(Duration::from_millis(20));
        let output = touch(dir.path(), "output.nc");
        assert!(up_to_date(&[input], &[output]).unwrap());
    }

    #[test]
    fn older_output_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let output = touch(dir.path(), "output.nc");
        sleep(Duration::from_millis(20));
        let input = touch(dir.path(), "input.tif");
        assert!(!up_to_date(&[input], &[output]).unwrap());
    }

    #[test]
    fn missing_output_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let input = touch(dir.path(), "input.tif");
        let missing = Utf8PathBuf::from_path_buf(dir.path().join("missing.nc")).unwrap();
        assert!(!up_to_date(&[input], &[missing]).unwrap());
    }

    #[test]
    fn empty_output_list_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let input = touch(dir.path(), "input.tif");
        assert!(!up_to_date(&[input], &[]).unwrap());
    }

    #[test]
    fn newest_input_wins() {
        let dir = tempfile::tempdir().unwrap();
        let old_input = touch(dir.path(), "old.tif");
        sleep(Duration::from_millis(20));
        let output = touch(dir.path(), "output.nc");
        sleep(Duration::from_millis(20));
        let new_input = touch(dir.path(), "new.tif");
        assert!(!up_to_date(&[old_input, new_input], &[output]).unwrap());
    }

    #[test]
    fn unreadable_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = touch(dir.path(), "output.nc");
        let missing_input = Utf8PathBuf::from_path_buf(dir.path().join("gone.tif")).unwrap();
        let err = up_to_date(&[missing_input], &[output]).unwrap_err();
        assert_matches!(err, IcevelError::Stat { .. });
    }
}
