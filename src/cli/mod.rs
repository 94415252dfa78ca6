pub mod add;
pub mod check;
pub mod clean;
pub mod dir;
pub mod info;
pub mod installations;
pub mod link;
pub mod list;
pub mod publish;
pub mod push;
pub mod remove;
pub mod restore;
pub mod retreat;
pub mod update;
pub mod where_used;

use std::env;
use std::path::{Path, PathBuf};
use yalc::config::Config;
use yalc::core::path::find_project_root;
use yalc::core::{PackageRef, YalcError, YalcResult};
use yalc::store::Store;

/// Resolved per-invocation state shared by every subcommand.
pub struct Context {
    pub cwd: PathBuf,
    pub config: Config,
    pub store: Store,
}

impl Context {
    /// Load config for the current directory. `store_folder` from the
    /// command line wins over every config source.
    pub fn load(quiet: bool, store_folder: Option<PathBuf>) -> YalcResult<Self> {
        let cwd = current_dir()?;
        let mut config = Config::load(&cwd)?;
        config.quiet |= quiet;
        if let Some(folder) = store_folder {
            config.store_folder = Some(absolute(&cwd, &folder));
        }
        let store = Store::from_config(&config)?;
        Ok(Self { cwd, config, store })
    }

    /// Nearest directory at or above the current one with a package.json.
    pub fn project_root(&self) -> YalcResult<PathBuf> {
        find_project_root(&self.cwd)
    }

    /// Print a success line unless quiet.
    pub fn success(&self, message: impl AsRef<str>) {
        if !self.config.quiet {
            println!("✓ {}", message.as_ref());
        }
    }
}

pub fn current_dir() -> YalcResult<PathBuf> {
    env::current_dir().map_err(|e| YalcError::Path(format!("Failed to get current directory: {}", e)))
}

pub fn absolute(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub fn parse_packages(args: &[String]) -> YalcResult<Vec<PackageRef>> {
    args.iter().map(|arg| PackageRef::parse(arg)).collect()
}

/// Collapse a `--x` / `--no-x` pair into an optional override.
pub fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
