//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$TRANSLINEAGE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/translineage/config.toml`
//! 3. `~/.translineage/config.toml` (canonical write location)
//!
//! # Project Config
//!
//! Located at `.translineage/config.toml` (canonical) in the project
//! directory.
//!
//! # Validation
//!
//! Config values are validated after parsing (e.g., the nesting bound must
//! be positive and the merge policy must be a known name).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::schema::MergePolicy;

/// Largest accepted nesting bound.
pub const MAX_NESTING_DEPTH_LIMIT: usize = 1024;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// max_nesting_depth = 32
/// merge_policy = "first_wins"
/// shared_resources = "/etc/etl/shared.toml"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Maximum composite nesting depth
    pub max_nesting_depth: Option<usize>,

    /// Merge policy at multi-input steps ("first_wins" or "strict")
    pub merge_policy: Option<String>,

    /// Shared resource pool file, relative to this config file
    pub shared_resources: Option<PathBuf>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_depth(self.max_nesting_depth)?;
        validate_policy(self.merge_policy.as_deref())
    }
}

/// Project configuration.
///
/// # Example
///
/// ```toml
/// merge_policy = "strict"
/// shared_resources = "shared.toml"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Maximum composite nesting depth
    pub max_nesting_depth: Option<usize>,

    /// Merge policy at multi-input steps
    pub merge_policy: Option<String>,

    /// Shared resource pool file, relative to the project directory
    pub shared_resources: Option<PathBuf>,
}

impl ProjectConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_depth(self.max_nesting_depth)?;
        validate_policy(self.merge_policy.as_deref())?;

        if let Some(path) = &self.shared_resources {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "shared_resources cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn validate_depth(depth: Option<usize>) -> Result<(), ConfigError> {
    match depth {
        Some(0) => Err(ConfigError::InvalidValue(
            "max_nesting_depth must be at least 1".to_string(),
        )),
        Some(d) if d > MAX_NESTING_DEPTH_LIMIT => Err(ConfigError::InvalidValue(format!(
            "max_nesting_depth {d} exceeds the limit of {MAX_NESTING_DEPTH_LIMIT}"
        ))),
        _ => Ok(()),
    }
}

fn validate_policy(policy: Option<&str>) -> Result<(), ConfigError> {
    if let Some(policy) = policy {
        if MergePolicy::parse(policy).is_none() {
            return Err(ConfigError::InvalidValue(format!(
                "invalid merge policy '{}', must be one of: {}",
                policy,
                MergePolicy::VALID_NAMES.join(", ")
            )));
        }
    }
    Ok(())
}
