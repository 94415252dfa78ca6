//! Read-only views over the store: listing, usage and totals.

use crate::core::version::compare_versions;
use crate::core::YalcResult;
use crate::package::manifest::PackageManifest;
use crate::store::installations::InstallationsRegistry;
use crate::store::Store;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Highest stored version of one package.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePackageInfo {
    pub name: String,
    /// Version from the stored manifest (may carry a signature suffix)
    pub version: String,
    pub published_at: DateTime<Utc>,
    pub size: u64,
    pub used_in_projects: Vec<PathBuf>,
    pub store_path: PathBuf,
    #[serde(skip)]
    pub manifest: Option<PackageManifest>,
}

impl StorePackageInfo {
    pub fn is_unused(&self) -> bool {
        self.used_in_projects.is_empty()
    }
}

/// Totals across the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_packages: usize,
    pub total_size: u64,
    pub unused_packages: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Every package in the store at its highest version, newest first.
///
/// Packages whose highest version has no readable manifest are skipped with a
/// warning.
pub fn list_store_packages(store: &Store) -> YalcResult<Vec<StorePackageInfo>> {
    let packages_dir = store.packages_dir();
    if !packages_dir.is_dir() {
        return Ok(Vec::new());
    }
    let registry = InstallationsRegistry::load(store)?;

    let mut packages = Vec::new();
    for entry in subdirectories(&packages_dir) {
        if entry.starts_with('@') {
            for scoped in subdirectories(&packages_dir.join(&entry)) {
                let name = format!("{}/{}", entry, scoped);
                packages.extend(package_info(store, &registry, &name));
            }
        } else {
            packages.extend(package_info(store, &registry, &entry));
        }
    }

    packages.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    Ok(packages)
}

/// Look up one package by name.
pub fn find_store_package(store: &Store, name: &str) -> YalcResult<Option<StorePackageInfo>> {
    Ok(list_store_packages(store)?
        .into_iter()
        .find(|pkg| pkg.name == name))
}

pub fn unused_packages(packages: &[StorePackageInfo]) -> Vec<&StorePackageInfo> {
    packages.iter().filter(|pkg| pkg.is_unused()).collect()
}

/// Totals for an already sorted (newest first) listing.
pub fn store_stats(packages: &[StorePackageInfo]) -> StoreStats {
    StoreStats {
        total_packages: packages.len(),
        total_size: packages.iter().map(|pkg| pkg.size).sum(),
        unused_packages: packages.iter().filter(|pkg| pkg.is_unused()).count(),
        last_activity: packages.iter().map(|pkg| pkg.published_at).max(),
    }
}

fn package_info(store: &Store, registry: &InstallationsRegistry, name: &str) -> Option<StorePackageInfo> {
    let package_dir = store.package_dir(name);
    let versions = subdirectories(&package_dir);
    let Some(latest) = versions
        .iter()
        .max_by(|a, b| compare_versions(a, b))
    else {
        tracing::warn!("Package {} has no version directories", name);
        return None;
    };

    let version_dir = package_dir.join(latest);
    if !version_dir.join("package.json").is_file() {
        tracing::warn!("Package {}@{} missing package.json", name, latest);
        return None;
    }
    let manifest = match PackageManifest::load(&version_dir) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::warn!("Package {}@{} has invalid manifest: {}", name, latest, e);
            return None;
        }
    };

    let published_at = std::fs::metadata(&version_dir)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    Some(StorePackageInfo {
        name: name.to_string(),
        version: manifest.version().to_string(),
        published_at,
        size: directory_size(&version_dir),
        used_in_projects: registry.projects(name).to_vec(),
        store_path: version_dir,
        manifest: Some(manifest),
    })
}

fn subdirectories(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

/// Total bytes of regular files under `path`. Unreadable entries count as 0.
pub fn directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Human readable size: `0 B`, `512.0 B`, `1.5 KB`, `2.0 MB`, `1.1 GB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

/// `just now`, `5m ago`, `3h ago`, `12d ago`, or a calendar date past 30 days.
pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 60 {
        if minutes <= 0 {
            "just now".to_string()
        } else {
            format!("{}m ago", minutes)
        }
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 30 {
        format!("{}d ago", days)
    } else {
        at.with_timezone(&Local).format("%Y-%m-%d").to_string()
    }
}
