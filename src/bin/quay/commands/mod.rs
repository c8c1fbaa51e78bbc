//! Command implementations

pub mod check;
pub mod completions;
pub mod compose;
pub mod explain;
pub mod flags;
pub mod list;

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::cli::{FlagArgs, GlobalArgs};
use quay::core::flags::FlagSet;
use quay::core::library::Library;
use quay::util::{Config, GlobalContext};

/// A loaded library together with the context it was found in.
pub struct Session {
    pub ctx: GlobalContext,
    pub path: PathBuf,
    pub library: Library,
    pub config: Config,
}

impl Session {
    /// Find and load the library and the configuration that applies to it.
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let mut ctx = GlobalContext::new()?;
        ctx.set_color(!global.no_color);

        let path = ctx.find_library(global.library.as_deref())?;
        tracing::debug!("using library {}", path.display());

        let library = Library::load(&path)?;
        let config = ctx.load_config(&path);

        Ok(Session {
            ctx,
            path,
            library,
            config,
        })
    }
}

impl FlagArgs {
    /// Build the flag set: config file flags, then CFLAGS, then `--flag`.
    pub fn resolve(&self, config: &Config) -> Result<FlagSet> {
        let mut flags = FlagSet::from_names(config.compose.flags.iter().cloned());

        if let Some(cflags) = &self.cflags {
            flags.extend_from_cflags(cflags);
        }

        for flag in &self.flags {
            match flag.split_once('=') {
                Some((name, _)) if name.is_empty() => bail!("invalid flag `{}`", flag),
                Some((name, value)) => flags.enable_with_value(name, value),
                None if flag.is_empty() => bail!("empty flag name"),
                None => flags.enable(flag.clone()),
            }
        }

        Ok(flags)
    }

    /// The configuration to use: `--configuration`, else the config file default.
    pub fn configuration(&self, config: &Config) -> Option<String> {
        self.configuration
            .clone()
            .or_else(|| config.compose.configuration.clone())
    }
}
