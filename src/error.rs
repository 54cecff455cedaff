use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum IcevelError {
    #[error("malformed date field `{value}` in granule name {name}")]
    MalformedDate { name: String, value: String },

    #[error("malformed nominal time `{value}` in granule name {name}")]
    MalformedTime { name: String, value: String },

    #[error("unknown sensor source: {0}")]
    UnknownSource(String),

    #[error("missing config file icevel.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read blacklist file at {0}")]
    BlacklistRead(PathBuf),

    #[error("cannot stat {path}: {message}")]
    Stat { path: String, message: String },

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("raster conversion failed: {0}")]
    ConversionFailed(String),

    #[error("merge failed: {0}")]
    MergeFailed(String),

    #[error("artifact read failed: {0}")]
    ArtifactRead(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
