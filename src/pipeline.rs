use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::info;

use crate::blacklist::Blacklist;
use crate::catalog::{self, GranuleFilter};
use crate::convert::{self, ConvertAction};
use crate::error::IcevelError;
use crate::fs_util;
use crate::granule::{Overrides, Source};
use crate::merge;
use crate::tools::{RasterTool, TimeAxisTool};

const RAW_EXT: &str = ".tif";

/// Everything one pipeline run needs to know. Callers guarantee the
/// (source, grid) restriction here; the catalog order is only temporal
/// under that restriction.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub data_dir: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub source: Source,
    pub grid: String,
    pub parameters: Vec<String>,
    pub reference_time: String,
    /// Final combined filename pattern with `{source}`/`{grid}`
    /// placeholders, e.g. `{source}_{grid}_2008_2020.nc`.
    pub combined_pattern: String,
}

impl RunPlan {
    pub fn combined_file_name(&self) -> String {
        self.combined_pattern
            .replace("{source}", self.source.as_str())
            .replace("{grid}", &self.grid)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub converted: usize,
    pub reused: usize,
    pub excluded: usize,
    pub merged: Vec<String>,
    pub combined: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub entries: Vec<ScanEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanEntry {
    pub file_name: String,
    pub source: String,
    pub grid: String,
    pub start_date: String,
    pub end_date: String,
    pub parameter: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QaResult {
    pub file: String,
    pub parameter: String,
    pub full_domain: f64,
    pub terminus_window: f64,
}

/// The ingestion/merge pipeline. Strictly sequential: every conversion and
/// merge blocks on an external tool call, and re-running after a kill is
/// safe because each granule is re-evaluated against its own timestamps.
pub struct Pipeline<R: RasterTool, T: TimeAxisTool> {
    raster: R,
    time_axis: T,
}

impl<R: RasterTool, T: TimeAxisTool> Pipeline<R, T> {
    pub fn new(raster: R, time_axis: T) -> Self {
        Self { raster, time_axis }
    }

    /// Runs the full pipeline: per parameter, catalog -> blacklist ->
    /// convert -> time-merge; then one cross-parameter combine over all
    /// per-parameter files. Merged artifacts carry no staleness tracking
    /// and are rebuilt unconditionally.
    pub fn run(&self, plan: &RunPlan, blacklist: &Blacklist) -> Result<RunResult, IcevelError> {
        fs_util::ensure_dir(&plan.output_dir)?;

        let mut converted = 0;
        let mut reused = 0;
        let mut excluded = 0;
        let mut merged = Vec::new();

        for parameter in &plan.parameters {
            let filter = GranuleFilter {
                source: Some(plan.source),
                grid: Some(plan.grid.clone()),
                parameter: Some(parameter.clone()),
                extension: Some(RAW_EXT.to_string()),
                ..GranuleFilter::default()
            };
            let catalog = catalog::build(&plan.data_dir, &filter)?;

            let overrides = Overrides {
                parameter: Some(parameter.clone()),
                extension: Some(RAW_EXT.to_string()),
            };
            let before = catalog.len();
            let catalog = blacklist.exclude(catalog, &overrides);
            excluded += before - catalog.len();

            let mut artifacts = Vec::with_capacity(catalog.len());
            for entry in &catalog {
                let conversion = convert::convert(
                    &self.raster,
                    &self.time_axis,
                    entry,
                    &plan.output_dir,
                    &plan.reference_time,
                )?;
                match conversion.action {
                    ConvertAction::Converted => converted += 1,
                    ConvertAction::Reused => reused += 1,
                }
                artifacts.push(conversion.artifact);
            }

            let merged_path = plan.output_dir.join(format!(
                "{}_{}_{}_merged.nc",
                plan.source, plan.grid, parameter
            ));
            merge::merge_parameter(&self.time_axis, &artifacts, &merged_path)?;
            merged.push(merged_path);
        }

        let combined_path = plan.output_dir.join(plan.combined_file_name());
        merge::combine_parameters(&self.time_axis, &merged, &combined_path)?;

        info!(
            "run complete: {converted} converted, {reused} reused, {excluded} blacklisted, combined {combined_path}"
        );

        Ok(RunResult {
            converted,
            reused,
            excluded,
            merged: merged.into_iter().map(Utf8PathBuf::into_string).collect(),
            combined: combined_path.into_string(),
        })
    }
}

/// Lists the filtered, ordered catalog without touching any artifact.
pub fn scan(data_dir: &Utf8Path, filter: &GranuleFilter) -> Result<ScanResult, IcevelError> {
    let catalog = catalog::build(data_dir, filter)?;
    let entries = catalog
        .iter()
        .map(|entry| ScanEntry {
            file_name: entry.file_name(),
            source: entry.record.source.to_string(),
            grid: entry.record.grid.clone(),
            start_date: entry.record.start_date.to_string(),
            end_date: entry.record.end_date.to_string(),
            parameter: entry.record.parameter.clone(),
            version: entry.record.version.clone(),
        })
        .collect();
    Ok(ScanResult { entries })
}
