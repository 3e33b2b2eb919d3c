//! Optional settings file (`--config`)
//!
//! ```toml
//! threads = 2
//!
//! [output]
//! enabled = true
//! directory = "output"
//!
//! [output.sampling]
//! threshold = 1000000
//! every = 1000
//! ```
//!
//! Every key is optional. Environment variables and command-line flags
//! override what the file sets.

use std::fs;
use std::path::Path;

use approx_pi::OutputConfig;
use serde::Deserialize;

use crate::error::CliError;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub threads: Option<u32>,
    pub output: OutputConfig,
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let content = fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| CliError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }
}
