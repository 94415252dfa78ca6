//! The shared package store: `<root>/packages/<name>/<version>/`.

pub mod installations;
pub mod listing;
pub mod packlist;
pub mod publisher;

use crate::config::Config;
use crate::core::path::{store_dir, store_packages_dir, INSTALLATIONS_FILE, SIGNATURE_FILE};
use crate::core::YalcResult;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub use installations::InstallationsRegistry;
pub use listing::{StorePackageInfo, StoreStats};
pub use publisher::{PublishOptions, PublishOutcome, Publisher};

/// Handle on a store root. Passed explicitly to everything that touches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root from config, falling back to the process-wide default.
    pub fn from_config(config: &Config) -> YalcResult<Self> {
        match &config.store_folder {
            Some(folder) => Ok(Self::new(folder.clone())),
            None => Ok(Self::new(store_dir()?)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn packages_dir(&self) -> PathBuf {
        store_packages_dir(&self.root)
    }

    /// Directory holding every stored version of `name`
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.packages_dir().join(name)
    }

    pub fn version_dir(&self, name: &str, version: &str) -> PathBuf {
        self.package_dir(name).join(version)
    }

    pub fn installations_file(&self) -> PathBuf {
        self.root.join(INSTALLATIONS_FILE)
    }

    /// Signature recorded for a stored version, if any.
    pub fn read_signature(&self, name: &str, version: &str) -> Option<String> {
        let path = self.version_dir(name, version).join(SIGNATURE_FILE);
        std::fs::read_to_string(path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Names of the version directories stored for `name`.
    pub fn versions(&self, name: &str) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.package_dir(name)) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect()
    }

    /// Most recently created version directory of `name`.
    pub fn latest_version(&self, name: &str) -> Option<String> {
        let package_dir = self.package_dir(name);
        self.versions(name)
            .into_iter()
            .max_by_key(|version| created_at(&package_dir.join(version)))
    }
}

fn created_at(path: &Path) -> Option<SystemTime> {
    let meta = std::fs::metadata(path).ok()?;
    meta.created().or_else(|_| meta.modified()).ok()
}
