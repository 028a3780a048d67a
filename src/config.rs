use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::ScaleVariant;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct Config {
    pub scale: ScaleVariant,
    pub prev_sgpa: String,
    pub prev_credits: String,
    /// Overrides the catalog's own credit total for the CGPA weight.
    pub current_credits: Option<f64>,
    /// CSV catalog to use instead of the built-in one.
    pub catalog: Option<PathBuf>,
    /// Start from the built-in default grades.
    pub default_grades: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scale: ScaleVariant::Six,
            prev_sgpa: "7.64".to_string(),
            prev_credits: "21".to_string(),
            current_credits: None,
            catalog: None,
            default_grades: true,
        }
    }
}

impl Config {
    /// Reads the TOML file at `path`, or returns defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if let Some(credits) = config.current_credits {
            anyhow::ensure!(
                credits.is_finite() && credits >= 0.0,
                "current_credits must be a non-negative number, got {credits}"
            );
        }

        Ok(config)
    }
}
