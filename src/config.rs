use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::IcevelError;
use crate::pipeline::RunPlan;

pub const DEFAULT_CONFIG_NAME: &str = "icevel.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    pub source: String,
    pub grid: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub reference_time: Option<String>,
    #[serde(default)]
    pub combined_pattern: Option<String>,
    #[serde(default)]
    pub blacklist: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub plan: RunPlan,
    pub blacklist: Option<Utf8PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, IcevelError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_NAME),
        };

        if path.is_none() && !config_path.exists() {
            return Err(IcevelError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| IcevelError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| IcevelError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, IcevelError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let parameters = if config.parameters.is_empty() {
            default_parameters()
        } else {
            config.parameters
        };

        let plan = RunPlan {
            data_dir: Utf8PathBuf::from(config.data_dir.unwrap_or_else(|| "data".to_string())),
            output_dir: Utf8PathBuf::from(
                config.output_dir.unwrap_or_else(|| "outputs".to_string()),
            ),
            source: config.source.parse()?,
            grid: config.grid,
            parameters,
            reference_time: config
                .reference_time
                .unwrap_or_else(|| "2008-01-01".to_string()),
            combined_pattern: config
                .combined_pattern
                .unwrap_or_else(|| "{source}_{grid}_combined.nc".to_string()),
        };

        Ok(ResolvedConfig {
            schema_version,
            plan,
            blacklist: config.blacklist.map(Utf8PathBuf::from),
        })
    }
}

pub fn default_parameters() -> Vec<String> {
    vec!["vx".to_string(), "vy".to_string(), "vv".to_string()]
}
