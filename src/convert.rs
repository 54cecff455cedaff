use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::catalog::CatalogEntry;
use crate::error::IcevelError;
use crate::fs_util::{self, TempGuard};
use crate::granule::{GranuleRecord, Overrides};
use crate::staleness::up_to_date;
use crate::tools::{NETCDF4_OPTIONS, RasterTool, TimeAxisSpec, TimeAxisTool, ToolCall};

const CONVERTED_EXT: &str = ".nc";
/// Extension of the raw intermediate written by the raster tool before the
/// time axis is applied. Deterministic so an interrupted run leaves a
/// recognizable name behind (and so cleanup is verifiable).
const INTERMEDIATE_EXT: &str = ".band0.nc";
const STAGE_EXT: &str = ".stage.nc";

/// A converted granule: same identity as its source record, pointed at the
/// output directory with the converted extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedArtifact {
    pub record: GranuleRecord,
    pub dir: Utf8PathBuf,
}

impl ConvertedArtifact {
    pub fn file_name(&self) -> String {
        self.record.file_name()
    }

    pub fn path(&self) -> Utf8PathBuf {
        self.dir.join(self.record.file_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertAction {
    /// Existing target was newer than the source; no tool was invoked.
    Reused,
    /// The external tools were run and the target republished.
    Converted,
}

#[derive(Debug)]
pub struct Conversion {
    pub artifact: ConvertedArtifact,
    pub action: ConvertAction,
}

/// Path of the raw intermediate the converter writes for `record` in
/// `output_dir`. Exposed so callers (and tests) can locate leftovers.
pub fn intermediate_path(record: &GranuleRecord, output_dir: &Utf8Path) -> Utf8PathBuf {
    output_dir.join(record.encode(&Overrides {
        extension: Some(INTERMEDIATE_EXT.to_string()),
        ..Overrides::default()
    }))
}

/// Converts one raw granule to a single-slice netCDF artifact.
///
/// Skips the external tools entirely when the existing target is newer
/// than the source. Otherwise the raster tool writes a raw intermediate,
/// the time-axis tool stamps the nominal (mid-interval) timestamp, units
/// and variable name onto a staging file, and the staging file is renamed
/// into place. Both scratch files are removed on every exit path, and the
/// final name never holds a partially written file.
pub fn convert<R: RasterTool, T: TimeAxisTool>(
    raster: &R,
    time_axis: &T,
    entry: &CatalogEntry,
    output_dir: &Utf8Path,
    reference_time: &str,
) -> Result<Conversion, IcevelError> {
    fs_util::ensure_dir(output_dir)?;

    let source_path = entry.path();
    let mut converted = entry.record.clone();
    converted.extension = CONVERTED_EXT.to_string();
    let artifact = ConvertedArtifact {
        record: converted,
        dir: output_dir.to_owned(),
    };
    let target_path = artifact.path();

    if up_to_date(&[source_path.clone()], &[target_path.clone()])? {
        info!("up to date: {target_path}");
        return Ok(Conversion {
            artifact,
            action: ConvertAction::Reused,
        });
    }

    info!("converting {source_path} -> {target_path}");

    let intermediate = TempGuard::new(intermediate_path(&entry.record, output_dir));
    let staged = TempGuard::new(output_dir.join(entry.record.encode(&Overrides {
        extension: Some(STAGE_EXT.to_string()),
        ..Overrides::default()
    })));

    raster.translate(
        &ToolCall::new(vec![source_path], intermediate.path().to_owned())
            .with_options(["-of", "netCDF"]),
    )?;

    let spec = TimeAxisSpec {
        reference_time: reference_time.to_string(),
        nominal_time: entry.record.nominal_datetime(),
        variable: entry.record.parameter.clone(),
        units: "m year-1".to_string(),
    };
    time_axis.set_time_axis(
        &ToolCall::new(
            vec![intermediate.path().to_owned()],
            staged.path().to_owned(),
        )
        .with_options(NETCDF4_OPTIONS.iter().copied()),
        &spec,
    )?;

    fs_util::publish(staged.path(), &target_path)?;

    Ok(Conversion {
        artifact,
        action: ConvertAction::Converted,
    })
}

#[cfg(test)]
mod tests {
    use crate::granule::GranuleRecord;

    use super::*;

    #[test]
    fn intermediate_path_is_deterministic() {
        let record = GranuleRecord::decode("TSX_W69.10N_02Jun18_13Jun18_09-48-58_vx_v02.0.tif")
            .unwrap()
            .unwrap();
        assert_eq!(
            intermediate_path(&record, Utf8Path::new("/out")),
            Utf8PathBuf::from("/out/TSX_W69.10N_02Jun18_13Jun18_09-48-58_vx_v02.0.band0.nc")
        );
    }

    #[test]
    fn artifact_keeps_identity_with_converted_extension() {
        let record = GranuleRecord::decode("TSX_W69.10N_02Jun18_13Jun18_09-48-58_vx_v02.0.tif")
            .unwrap()
            .unwrap();
        let mut converted = record.clone();
        converted.extension = CONVERTED_EXT.to_string();
        let artifact = ConvertedArtifact {
            record: converted,
            dir: Utf8PathBuf::from("/out"),
        };
        assert_eq!(
            artifact.path(),
            Utf8PathBuf::from("/out/TSX_W69.10N_02Jun18_13Jun18_09-48-58_vx_v02.0.nc")
        );
    }
}
