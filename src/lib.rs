#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
// #![deny(clippy::all)]
// #![warn(clippy::pedantic)]
#![warn(clippy::all)]
// #![warn(clippy::restriction)]
// #![warn(clippy::nursery)]
// #![warn(clippy::cargo)]
pub mod cli;
pub mod feyngen;
pub mod fks;
pub mod model;
pub mod process;
#[cfg(test)]
pub mod tests;

use std::fs;
use std::path::Path;

use color_eyre::{Help, Report};
use eyre::WrapErr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use cli::LogFormat;
use fks::FksError;

const fn _default_true() -> bool {
    true
}

fn _default_log_level() -> String {
    "info".into()
}

fn _default_multiparticles() -> IndexMap<String, Vec<String>> {
    let labels: [(&str, &[&str]); 6] = [
        ("p", &["g", "u", "c", "d", "s", "u~", "c~", "d~", "s~"]),
        ("j", &["g", "u", "c", "d", "s", "u~", "c~", "d~", "s~"]),
        ("l+", &["e+", "mu+"]),
        ("l-", &["e-", "mu-"]),
        ("vl", &["ve", "vm", "vt"]),
        ("vl~", &["ve~", "vm~", "vt~"]),
    ];
    labels
        .into_iter()
        .map(|(label, particles)| {
            (
                label.to_string(),
                particles.iter().map(|p| p.to_string()).collect(),
            )
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationSettings {
    /// Drop double-counted real emissions instead of only flagging them.
    #[serde(default = "_default_true")]
    pub remove_reals: bool,
    #[serde(default = "_default_multiparticles")]
    pub multiparticles: IndexMap<String, Vec<String>>,
    #[serde(default = "_default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            remove_reals: _default_true(),
            multiparticles: _default_multiparticles(),
            log_level: _default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl GenerationSettings {
    pub fn from_yaml_value(value: &serde_yaml::Value) -> Result<GenerationSettings, FksError> {
        if value.is_null() {
            return Ok(GenerationSettings::default());
        }
        if let Some(remove_reals) = value.get("remove_reals") {
            if !remove_reals.is_bool() {
                return Err(FksError::Configuration(format!(
                    "'remove_reals' must be a boolean, found {}",
                    serde_yaml::to_string(remove_reals)
                        .unwrap_or_default()
                        .trim()
                )));
            }
        }
        serde_yaml::from_value(value.clone()).map_err(|e| {
            FksError::Configuration(format!("could not parse generation settings: {}", e))
        })
    }

    pub fn from_yaml_str(yaml_str: &str) -> Result<GenerationSettings, Report> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml_str)
            .wrap_err("Could not parse settings file")
            .suggestion("Is it a correct yaml file")?;
        Ok(GenerationSettings::from_yaml_value(&value)?)
    }

    pub fn from_file(file_path: impl AsRef<Path>) -> Result<GenerationSettings, Report> {
        let file_path = file_path.as_ref();
        let yaml_str = fs::read_to_string(file_path)
            .wrap_err_with(|| format!("Could not open settings file {}", file_path.display()))
            .suggestion("Does the path exist?")?;
        GenerationSettings::from_yaml_str(&yaml_str)
    }
}
