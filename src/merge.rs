use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::convert::ConvertedArtifact;
use crate::error::IcevelError;
use crate::fs_util::{self, TempGuard};
use crate::tools::{NETCDF4_OPTIONS, TimeAxisTool, ToolCall};

/// Concatenates single-slice artifacts along the time axis into one
/// per-parameter multi-epoch file.
///
/// Precondition: `artifacts` is already restricted to a single
/// (source, grid, parameter) and carries the catalog's order, which is
/// temporal order under that restriction. The output is staged under a
/// temporary name and renamed on success only.
pub fn merge_parameter<T: TimeAxisTool>(
    time_axis: &T,
    artifacts: &[ConvertedArtifact],
    output: &Utf8Path,
) -> Result<(), IcevelError> {
    if artifacts.is_empty() {
        return Err(IcevelError::MergeFailed(format!(
            "no artifacts to merge into {output}"
        )));
    }

    let inputs: Vec<Utf8PathBuf> = artifacts.iter().map(ConvertedArtifact::path).collect();
    info!("merging {} slices -> {output}", inputs.len());

    let staged = TempGuard::new(fs_util::staging_path(output));
    time_axis.merge_time(
        &ToolCall::new(inputs, staged.path().to_owned())
            .with_options(NETCDF4_OPTIONS.iter().copied()),
    )?;
    fs_util::publish(staged.path(), output)
}

/// Combines every per-parameter merged file into one dataset sharing the
/// common time axis. Same staging discipline as `merge_parameter`: a
/// failed combine leaves nothing under the final name.
pub fn combine_parameters<T: TimeAxisTool>(
    time_axis: &T,
    inputs: &[Utf8PathBuf],
    output: &Utf8Path,
) -> Result<(), IcevelError> {
    if inputs.is_empty() {
        return Err(IcevelError::MergeFailed(format!(
            "no per-parameter files to combine into {output}"
        )));
    }

    info!("combining {} parameters -> {output}", inputs.len());

    let staged = TempGuard::new(fs_util::staging_path(output));
    time_axis.merge_variables(
        &ToolCall::new(inputs.to_vec(), staged.path().to_owned())
            .with_options(NETCDF4_OPTIONS.iter().copied()),
    )?;
    fs_util::publish(staged.path(), output)
}
