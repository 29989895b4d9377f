//! 配置管理
//!
//! Settings come from an optional TOML or JSON file, overridden by
//! `BEAD__*` environment variables (`BEAD__LOGGING__LEVEL=debug`). Missing
//! sections fall back to their defaults.

use crate::error::{BeadError, Result};
use crate::storage::{BeadBox, UnionBox};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

pub const ENV_PREFIX: &str = "BEAD";
pub const ENV_SEPARATOR: &str = "__";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// 全局配置根结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BeadConfig {
    #[validate(nested)]
    pub logging: LoggingConfig,

    #[validate(nested)]
    pub boxes: Vec<BoxConfig>,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    #[validate(custom(function = "validate_level"))]
    pub level: String,

    pub json: bool,
}

/// A named box directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BoxConfig {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(custom(function = "validate_location"))]
    pub location: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl BeadConfig {
    /**
     * Load the configuration
     *
     * # Arguments
     *
     * * `path` - Optional config file, its format follows the extension;
     *   a missing file is not an error
     *
     * # Errors
     *
     * `BeadError::Config` when a source cannot be parsed or the merged
     * settings fail validation.
     */
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR),
        );

        let settings: BeadConfig = builder.build()?.try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    /// Validate field constraints and box name uniqueness
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| BeadError::Config(e.to_string()))?;

        let mut seen = BTreeSet::new();
        for box_config in &self.boxes {
            if !seen.insert(box_config.name.as_str()) {
                return Err(BeadError::Config(format!(
                    "box name \"{}\" is configured more than once",
                    box_config.name
                )));
            }
        }
        Ok(())
    }

    /// Union of the configured boxes, in configuration order
    pub fn union_box(&self) -> UnionBox {
        UnionBox::new(
            self.boxes
                .iter()
                .map(|b| BeadBox::new(b.name.clone(), b.location.clone())),
        )
    }
}

fn validate_level(level: &str) -> std::result::Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_log_level"))
    }
}

fn validate_location(location: &Path) -> std::result::Result<(), ValidationError> {
    if location.as_os_str().is_empty() {
        Err(ValidationError::new("empty_location"))
    } else {
        Ok(())
    }
}
