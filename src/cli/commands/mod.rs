//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens a [`Session`] (config, shared pool, registry, resolver options)
//! 2. Loads the definition file
//! 3. Resolves and formats output
//!
//! CLI flags take precedence over configuration values.

mod check;
mod completion;
mod config_cmd;
mod fields;
mod resources;

pub use check::check;
pub use completion::completion;
pub use config_cmd::{get as config_get, list as config_list, set as config_set};
pub use fields::fields;
pub use resources::resources;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use super::args::{Command, ConfigAction};
use super::Context;
use crate::core::config::Config;
use crate::core::definition::Loader;
use crate::core::resources::SharedResourcePool;
use crate::core::schema::MergePolicy;
use crate::core::transformation::Transformation;
use crate::lineage::{LineageResolver, ResolverOptions};
use crate::steps::StepRegistry;
use crate::ui::output;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Fields {
            file,
            step,
            input,
            json,
        } => fields::fields(ctx, &file, &step, input, json),
        Command::Resources { file, json } => resources::resources(ctx, &file, json),
        Command::Check { file } => check::check(ctx, &file),
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value } => config_cmd::set(ctx, &key, &value),
            ConfigAction::List => config_cmd::list(ctx),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Everything a command needs to load and resolve definitions.
pub(crate) struct Session {
    pub dir: PathBuf,
    pub registry: StepRegistry,
    pub pool: SharedResourcePool,
    pub options: ResolverOptions,
}

impl Session {
    /// Load configuration and the shared pool, applying CLI overrides.
    pub fn open(ctx: &Context) -> Result<Self> {
        let dir = ctx.working_dir()?;
        let loaded = Config::load(Some(&dir)).context("Failed to load config")?;
        for warning in &loaded.warnings {
            output::warn(
                format!("{} ({})", warning.message, warning.path.display()),
                ctx.verbosity,
            );
        }
        let config = loaded.config;

        let mut options = ResolverOptions::from_config(&config);
        if let Some(depth) = ctx.max_depth {
            if depth == 0 {
                bail!("--max-depth must be at least 1");
            }
            options.max_nesting_depth = depth;
        }
        if ctx.strict_merge {
            options.merge_policy = MergePolicy::Strict;
        }

        let pool_path = ctx
            .shared
            .as_ref()
            .map(|p| dir.join(p))
            .or_else(|| config.shared_resources());
        let pool = match pool_path {
            Some(path) => SharedResourcePool::load(&path).with_context(|| {
                format!("Failed to load shared resources from '{}'", path.display())
            })?,
            None => SharedResourcePool::new(),
        };

        Ok(Self {
            dir,
            registry: StepRegistry::with_builtins(),
            pool,
            options,
        })
    }

    /// Load a definition file, relative to the working directory.
    pub fn load(&self, file: &Path) -> Result<Transformation> {
        let path = self.dir.join(file);
        Loader::new(&self.registry, &self.pool)
            .load_file(&path)
            .with_context(|| format!("Failed to load '{}'", file.display()))
    }

    pub fn resolver<'a>(&'a self, transformation: &'a Transformation) -> LineageResolver<'a> {
        LineageResolver::new(transformation, &self.registry, self.options)
    }
}
