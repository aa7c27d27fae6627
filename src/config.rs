use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::DiceError;
use crate::fs_util;

pub const DEFAULT_CONFIG_FILE: &str = "gdc-dice.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DiceConfig {
    #[serde(default)]
    pub mirror_dir: Option<String>,
    #[serde(default)]
    pub dice_dir: Option<String>,
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default)]
    pub programs: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub translation_table: Option<String>,
    #[serde(default)]
    pub aggregates: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub mirror_dir: Option<String>,
    pub dice_dir: Option<String>,
    pub log_dir: Option<String>,
    pub timestamp: Option<String>,
    pub programs: Vec<String>,
    pub projects: Vec<String>,
    pub translation_table: Option<String>,
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mirror_root: Utf8PathBuf,
    pub dice_root: Utf8PathBuf,
    pub log_dir: Option<Utf8PathBuf>,
    pub timestamp: String,
    pub programs: Vec<String>,
    pub projects: Vec<String>,
    pub translation_table: Option<Utf8PathBuf>,
    pub aggregates: BTreeMap<String, String>,
    pub force: bool,
    pub dry_run: bool,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<DiceConfig, DiceError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(DiceConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| DiceError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| DiceError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(
        config: DiceConfig,
        overrides: ConfigOverrides,
    ) -> Result<RunConfig, DiceError> {
        let mirror_root = overrides
            .mirror_dir
            .or(config.mirror_dir)
            .map(Utf8PathBuf::from)
            .ok_or_else(|| DiceError::ConfigParse("mirror directory is not set".to_string()))?;
        let dice_root = overrides
            .dice_dir
            .or(config.dice_dir)
            .map(Utf8PathBuf::from)
            .ok_or_else(|| DiceError::ConfigParse("dice directory is not set".to_string()))?;
        let log_dir = overrides.log_dir.or(config.log_dir).map(Utf8PathBuf::from);
        let timestamp = overrides.timestamp.unwrap_or_else(default_timestamp);

        let programs = if !overrides.programs.is_empty() {
            overrides.programs
        } else if !config.programs.is_empty() {
            config.programs
        } else {
            fs_util::immediate_subdirs(&mirror_root)?
        };

        let projects = if !overrides.projects.is_empty() {
            overrides.projects
        } else if !config.projects.is_empty() {
            config.projects
        } else {
            let mut projects = Vec::new();
            for program in &programs {
                for project in fs_util::immediate_subdirs(&mirror_root.join(program))? {
                    if project != "metadata" && !projects.contains(&project) {
                        projects.push(project);
                    }
                }
            }
            projects
        };

        Ok(RunConfig {
            mirror_root,
            dice_root,
            log_dir,
            timestamp,
            programs,
            projects,
            translation_table: overrides
                .translation_table
                .or(config.translation_table)
                .map(Utf8PathBuf::from),
            aggregates: config.aggregates,
            force: overrides.force,
            dry_run: overrides.dry_run,
        })
    }
}

pub fn default_timestamp() -> String {
    chrono::Local::now().format("%Y_%m_%d__%H_%M_%S").to_string()
}
