use std::path::PathBuf;
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDateTime;

use crate::error::IcevelError;

/// Output options applied to every netCDF-producing tool call: netCDF-4
/// with level-2 deflate.
pub const NETCDF4_OPTIONS: &[&str] = &["-f", "nc4", "-z", "zip_2"];

/// One external tool invocation: all knowledge of a tool's call shape is
/// confined to the adapter that consumes this.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub inputs: Vec<Utf8PathBuf>,
    pub output: Utf8PathBuf,
    pub options: Vec<String>,
}

impl ToolCall {
    pub fn new(inputs: Vec<Utf8PathBuf>, output: Utf8PathBuf) -> Self {
        Self {
            inputs,
            output,
            options: Vec::new(),
        }
    }

    pub fn with_options<I: IntoIterator<Item = S>, S: Into<String>>(mut self, options: I) -> Self {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// Time-axis directives applied while finalizing a converted granule.
#[derive(Debug, Clone)]
pub struct TimeAxisSpec {
    /// Epoch the time coordinate is expressed relative to, e.g. `2008-01-01`.
    pub reference_time: String,
    /// Mid-point acquisition timestamp assigned to the slice.
    pub nominal_time: NaiveDateTime,
    /// Final variable name; the raster tool emits a generic band name.
    pub variable: String,
    /// Physical units attached to the variable.
    pub units: String,
}

/// Single-in/single-out raster-to-grid conversion. Nonzero exit is failure.
pub trait RasterTool: Send + Sync {
    fn translate(&self, call: &ToolCall) -> Result<(), IcevelError>;
}

/// Time-axis aware netCDF manipulation.
pub trait TimeAxisTool: Send + Sync {
    /// Sets the time axis and variable metadata on a freshly converted file.
    fn set_time_axis(&self, call: &ToolCall, spec: &TimeAxisSpec) -> Result<(), IcevelError>;
    /// Concatenates single-epoch inputs along the time axis, sorted by time.
    fn merge_time(&self, call: &ToolCall) -> Result<(), IcevelError>;
    /// Combines distinct variables sharing a time axis into one file.
    fn merge_variables(&self, call: &ToolCall) -> Result<(), IcevelError>;
}

/// Read access to a converted artifact's first time slice, used only by the
/// offline QA diagnostics.
pub trait SliceReader: Send + Sync {
    /// (rows, cols) of the artifact's grid.
    fn grid_shape(&self, path: &Utf8Path) -> Result<(usize, usize), IcevelError>;
    /// Values of the named variable's first time slice, row-major.
    fn first_slice(&self, path: &Utf8Path, parameter: &str) -> Result<Vec<f64>, IcevelError>;
}

/// `gdal_translate` adapter. GDAL gets the projection right but names the
/// variable `Band1` and attaches no metadata; the time-axis tool fixes both.
pub struct GdalTranslate {
    program: PathBuf,
}

impl GdalTranslate {
    pub fn new() -> Result<Self, IcevelError> {
        let program = find_in_path("gdal_translate")
            .ok_or_else(|| IcevelError::MissingTool("gdal_translate".to_string()))?;
        Ok(Self { program })
    }

    pub fn with_program(program: PathBuf) -> Self {
        Self { program }
    }
}

impl RasterTool for GdalTranslate {
    fn translate(&self, call: &ToolCall) -> Result<(), IcevelError> {
        let mut args = call.options.clone();
        for input in &call.inputs {
            args.push(input.to_string());
        }
        args.push(call.output.to_string());
        run_tool(&self.program, &args).map_err(IcevelError::ConversionFailed)?;
        Ok(())
    }
}

/// `cdo` adapter covering all three time-axis behaviors plus the slice
/// dump used by QA.
pub struct Cdo {
    program: PathBuf,
}

impl Cdo {
    pub fn new() -> Result<Self, IcevelError> {
        let program =
            find_in_path("cdo").ok_or_else(|| IcevelError::MissingTool("cdo".to_string()))?;
        Ok(Self { program })
    }

    pub fn with_program(program: PathBuf) -> Self {
        Self { program }
    }

    fn run(&self, args: &[String]) -> Result<(), IcevelError> {
        run_tool(&self.program, args).map_err(IcevelError::MergeFailed)?;
        Ok(())
    }
}

impl TimeAxisTool for Cdo {
    fn set_time_axis(&self, call: &ToolCall, spec: &TimeAxisSpec) -> Result<(), IcevelError> {
        let [input] = call.inputs.as_slice() else {
            return Err(IcevelError::ConversionFailed(
                "set_time_axis expects exactly one input".to_string(),
            ));
        };
        let mut args = call.options.clone();
        args.push(format!(
            "settaxis,{},{}",
            spec.nominal_time.format("%Y-%m-%d"),
            spec.nominal_time.format("%H:%M:%S"),
        ));
        args.push(format!("-setreftime,{}", spec.reference_time));
        args.push(format!(
            "-setattribute,{}@units=\"{}\"",
            spec.variable, spec.units
        ));
        args.push(format!("-chname,Band1,{}", spec.variable));
        args.push(input.to_string());
        args.push(call.output.to_string());
        run_tool(&self.program, &args).map_err(IcevelError::ConversionFailed)?;
        Ok(())
    }

    fn merge_time(&self, call: &ToolCall) -> Result<(), IcevelError> {
        let mut args = call.options.clone();
        args.push("mergetime".to_string());
        for input in &call.inputs {
            args.push(input.to_string());
        }
        args.push(call.output.to_string());
        self.run(&args)
    }

    fn merge_variables(&self, call: &ToolCall) -> Result<(), IcevelError> {
        let mut args = call.options.clone();
        args.push("merge".to_string());
        for input in &call.inputs {
            args.push(input.to_string());
        }
        args.push(call.output.to_string());
        self.run(&args)
    }
}

impl SliceReader for Cdo {
    fn grid_shape(&self, path: &Utf8Path) -> Result<(usize, usize), IcevelError> {
        let args = vec!["-s".to_string(), "griddes".to_string(), path.to_string()];
        let stdout = run_tool_capture(&self.program, &args).map_err(IcevelError::ArtifactRead)?;
        let mut xsize = None;
        let mut ysize = None;
        for line in stdout.lines() {
            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "xsize" => xsize = value.trim().parse::<usize>().ok(),
                    "ysize" => ysize = value.trim().parse::<usize>().ok(),
                    _ => {}
                }
            }
        }
        match (ysize, xsize) {
            (Some(rows), Some(cols)) => Ok((rows, cols)),
            _ => Err(IcevelError::ArtifactRead(format!(
                "no grid dimensions reported for {path}"
            ))),
        }
    }

    fn first_slice(&self, path: &Utf8Path, parameter: &str) -> Result<Vec<f64>, IcevelError> {
        let args = vec![
            "-s".to_string(),
            "outputf,%g,1".to_string(),
            "-seltimestep,1".to_string(),
            format!("-selname,{parameter}"),
            path.to_string(),
        ];
        let stdout = run_tool_capture(&self.program, &args).map_err(IcevelError::ArtifactRead)?;
        stdout
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    IcevelError::ArtifactRead(format!("unexpected value `{token}` in {path}"))
                })
            })
            .collect()
    }
}

fn run_tool(program: &PathBuf, args: &[String]) -> Result<(), String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|err| format!("{}: {err}", program.display()))?;
    if output.status.success() {
        return Ok(());
    }
    Err(failure_message(program, &output.stderr))
}

fn run_tool_capture(program: &PathBuf, args: &[String]) -> Result<String, String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|err| format!("{}: {err}", program.display()))?;
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }
    Err(failure_message(program, &output.stderr))
}

fn failure_message(program: &PathBuf, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    if stderr.is_empty() {
        format!("command failed: {}", program.display())
    } else {
        stderr
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let candidate = path.join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_builder_collects_options() {
        let call = ToolCall::new(
            vec![Utf8PathBuf::from("in.tif")],
            Utf8PathBuf::from("out.nc"),
        )
        .with_options(NETCDF4_OPTIONS.iter().copied());
        assert_eq!(call.options, vec!["-f", "nc4", "-z", "zip_2"]);
    }
}
