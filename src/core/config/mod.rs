//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! translineage has two configuration scopes:
//! - **Global**: User-level settings
//! - **Project**: Settings for the directory holding definition files
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$TRANSLINEAGE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/translineage/config.toml`
//! 3. `~/.translineage/config.toml` (canonical write location)
//!
//! # Project Config Locations
//!
//! Searched in order:
//! 1. `.translineage/config.toml` (canonical)
//! 2. `translineage.toml` (compatibility, warns)
//!
//! # Example
//!
//! ```no_run
//! use translineage::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/project"))).unwrap();
//! let config = result.config;
//!
//! println!("Max depth: {}", config.max_nesting_depth());
//! println!("Merge policy: {:?}", config.merge_policy());
//! if let Some(pool) = config.shared_resources() {
//!     println!("Shared resources: {}", pool.display());
//! }
//! ```

pub mod schema;

pub use schema::{GlobalConfig, ProjectConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::schema::MergePolicy;
use crate::lineage::DEFAULT_MAX_NESTING_DEPTH;

/// Environment variable naming the global config file.
pub const CONFIG_ENV: &str = "TRANSLINEAGE_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence rules; project config overrides global
/// config.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Project configuration (if found)
    pub project: Option<ProjectConfig>,
    global_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
    project_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_dir` is provided, also loads project config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(project_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_with_global(Self::find_global(), project_dir)
    }

    /// Load configuration from an explicit global file.
    pub fn load_with_global(
        global_file: Option<PathBuf>,
        project_dir: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let global = match &global_file {
            Some(path) => Self::read_config::<GlobalConfig>(path)?,
            None => GlobalConfig::default(),
        };

        let (project, project_path) = match project_dir {
            Some(dir) => Self::load_project(dir, &mut warnings)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref p) = project {
            p.validate()?;
        }

        tracing::debug!(
            global = ?global_file,
            project = ?project_path,
            "configuration loaded"
        );

        Ok(ConfigLoadResult {
            config: Config {
                global,
                project,
                global_path: global_file,
                project_path,
                project_dir: project_dir.map(Path::to_path_buf),
            },
            warnings,
        })
    }

    /// First existing global config file, if any.
    fn find_global() -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            candidates.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            candidates.push(PathBuf::from(xdg_home).join("translineage/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".translineage/config.toml"));
        }
        candidates.into_iter().find(|p| p.exists())
    }

    /// Load project configuration from standard locations.
    fn load_project(
        dir: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Option<ProjectConfig>, Option<PathBuf>), ConfigError> {
        let canonical = Self::project_config_path(dir);
        if canonical.exists() {
            let config = Self::read_config(&canonical)?;
            return Ok((Some(config), Some(canonical)));
        }

        let compat = dir.join("translineage.toml");
        if compat.exists() {
            warnings.push(ConfigWarning {
                message: format!(
                    "Using deprecated config location. Please move to '{}'",
                    canonical.display()
                ),
                path: compat.clone(),
            });
            let config = Self::read_config(&compat)?;
            return Ok((Some(config), Some(compat)));
        }

        Ok((None, None))
    }

    /// Read and parse a config file.
    fn read_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for project config.
    pub fn project_config_path(dir: &Path) -> PathBuf {
        dir.join(".translineage/config.toml")
    }

    /// Write project config atomically.
    ///
    /// Creates parent directories if needed. Writes a temp file, then
    /// renames it over the target.
    pub fn write_project(dir: &Path, config: &ProjectConfig) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = Self::project_config_path(dir);
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    fn write_config_atomic<T: serde::Serialize>(
        path: &Path,
        config: &T,
    ) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Maximum composite nesting depth.
    ///
    /// Defaults to [`DEFAULT_MAX_NESTING_DEPTH`] if not configured.
    pub fn max_nesting_depth(&self) -> usize {
        self.project
            .as_ref()
            .and_then(|p| p.max_nesting_depth)
            .or(self.global.max_nesting_depth)
            .unwrap_or(DEFAULT_MAX_NESTING_DEPTH)
    }

    /// Merge policy at multi-input steps.
    ///
    /// Defaults to first-wins if not configured.
    pub fn merge_policy(&self) -> MergePolicy {
        self.project
            .as_ref()
            .and_then(|p| p.merge_policy.as_deref())
            .or(self.global.merge_policy.as_deref())
            .and_then(MergePolicy::parse)
            .unwrap_or_default()
    }

    /// Shared resource pool file.
    ///
    /// Relative paths are resolved against the project directory (project
    /// config) or the directory of the global config file.
    pub fn shared_resources(&self) -> Option<PathBuf> {
        if let Some(path) = self.project.as_ref().and_then(|p| p.shared_resources.as_ref()) {
            return Some(match &self.project_dir {
                Some(dir) => dir.join(path),
                None => path.clone(),
            });
        }
        let path = self.global.shared_resources.as_ref()?;
        let base = self.global_path.as_deref().and_then(Path::parent);
        Some(match base {
            Some(dir) => dir.join(path),
            None => path.clone(),
        })
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded project config file.
    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}
