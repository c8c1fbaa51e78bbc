//! Global context for Quay operations.
//!
//! Provides centralized access to paths, configuration and library
//! discovery.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;

use crate::core::library::LIBRARY_NAME;
use crate::util::config::{global_config_dir, load_config, project_config_path, Config};
use crate::util::diagnostic::suggestions;

/// Project directories for Quay
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("com", "quay", "quay"));

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global Quay data (~/.quay/)
    home: PathBuf,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = global_config_dir()
            .or_else(|| {
                PROJECT_DIRS
                    .as_ref()
                    .map(|dirs| dirs.config_dir().to_path_buf())
            })
            .unwrap_or_else(|| PathBuf::from(".quay"));

        Ok(GlobalContext {
            cwd,
            home,
            color: true,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Set color output.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Check if color output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Resolve a path given on the command line against the cwd.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Find the library file: an explicit path if given, otherwise
    /// `Quay.toml` searched from the cwd upward.
    pub fn find_library(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            let path = self.resolve(path);
            let path = if path.is_dir() {
                path.join(LIBRARY_NAME)
            } else {
                path
            };
            if !path.is_file() {
                bail!("library file not found: {}", path.display());
            }
            return Ok(path);
        }

        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(LIBRARY_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                bail!(
                    "could not find `{}` in {} or any parent directory\n{}",
                    LIBRARY_NAME,
                    self.cwd.display(),
                    suggestions::NO_LIBRARY
                );
            }
        }
    }

    /// Load the merged global and project configuration. The project
    /// config is looked up next to the library.
    pub fn load_config(&self, library: &Path) -> Config {
        let project_root = library.parent().unwrap_or(&self.cwd);
        load_config(&self.config_path(), &project_config_path(project_root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_paths() {
        let ctx = GlobalContext::new().unwrap();
        assert!(ctx.cwd().is_absolute());
        assert!(ctx.config_path().ends_with("config.toml"));
    }

    #[test]
    fn test_find_library_walks_up() {
        let tmp = TempDir::new().unwrap();
        let library = tmp.path().join(LIBRARY_NAME);
        std::fs::write(&library, "[library]\nname = \"x\"\n").unwrap();
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = GlobalContext::with_cwd(nested).unwrap();
        assert_eq!(ctx.find_library(None).unwrap(), library);
    }

    #[test]
    fn test_find_library_explicit() {
        let tmp = TempDir::new().unwrap();
        let library = tmp.path().join("surface.toml");
        std::fs::write(&library, "[library]\nname = \"x\"\n").unwrap();

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        assert_eq!(
            ctx.find_library(Some(Path::new("surface.toml"))).unwrap(),
            library
        );
        assert!(ctx.find_library(Some(Path::new("missing.toml"))).is_err());
    }

    #[test]
    fn test_find_library_explicit_directory() {
        let tmp = TempDir::new().unwrap();
        let library = tmp.path().join(LIBRARY_NAME);
        std::fs::write(&library, "[library]\nname = \"x\"\n").unwrap();

        let ctx = GlobalContext::with_cwd(PathBuf::from("/")).unwrap();
        assert_eq!(ctx.find_library(Some(tmp.path())).unwrap(), library);
    }

    #[test]
    fn test_project_config_next_to_library() {
        let tmp = TempDir::new().unwrap();
        let library = tmp.path().join(LIBRARY_NAME);
        std::fs::create_dir_all(tmp.path().join(".quay")).unwrap();
        std::fs::write(
            tmp.path().join(".quay/config.toml"),
            "[compose]\nconfiguration = \"bindgen\"\n",
        )
        .unwrap();

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        let config = ctx.load_config(&library);
        assert_eq!(config.compose.configuration.as_deref(), Some("bindgen"));
    }
}
