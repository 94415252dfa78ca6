//! Global record of which projects consume which stored packages.

use crate::core::{YalcError, YalcResult};
use crate::package::lockfile::Lockfile;
use crate::store::Store;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// `installations.json`: package name to consuming project paths.
///
/// A path is listed at most once per package and a package with no
/// remaining projects is dropped.
#[derive(Debug, Clone, Default)]
pub struct InstallationsRegistry {
    path: PathBuf,
    entries: BTreeMap<String, Vec<PathBuf>>,
}

impl InstallationsRegistry {
    /// Read the registry of a store. A missing file is an empty registry.
    pub fn load(store: &Store) -> YalcResult<Self> {
        let path = store.installations_file();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn save(&self) -> YalcResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| YalcError::Store(format!("Failed to serialize installations: {}", e)))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Record `project` as a consumer of `name`. Returns false if already listed.
    pub fn add(&mut self, name: &str, project: &Path) -> bool {
        let projects = self.entries.entry(name.to_string()).or_default();
        if projects.iter().any(|p| p == project) {
            return false;
        }
        projects.push(project.to_path_buf());
        true
    }

    /// Forget `project` for `name`. Returns false if it was not listed.
    pub fn remove(&mut self, name: &str, project: &Path) -> bool {
        let Some(projects) = self.entries.get_mut(name) else {
            return false;
        };
        let before = projects.len();
        projects.retain(|p| p != project);
        let removed = projects.len() != before;
        if projects.is_empty() {
            self.entries.remove(name);
        }
        removed
    }

    pub fn projects(&self, name: &str) -> &[PathBuf] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entries(&self) -> &BTreeMap<String, Vec<PathBuf>> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A (package, project) pair as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub name: String,
    pub path: PathBuf,
}

impl Installation {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Add installations and persist if anything changed.
pub fn add_installations(store: &Store, installations: &[Installation]) -> YalcResult<()> {
    if installations.is_empty() {
        return Ok(());
    }
    let mut registry = InstallationsRegistry::load(store)?;
    let mut changed = false;
    for installation in installations {
        changed |= registry.add(&installation.name, &installation.path);
    }
    if changed {
        registry.save()?;
    }
    Ok(())
}

/// Remove installations and persist if anything changed.
pub fn remove_installations(store: &Store, installations: &[Installation]) -> YalcResult<()> {
    if installations.is_empty() {
        return Ok(());
    }
    let mut registry = InstallationsRegistry::load(store)?;
    let mut changed = false;
    for installation in installations {
        if registry.remove(&installation.name, &installation.path) {
            tracing::info!(
                "Removing installation of {} in {}",
                installation.name,
                installation.path.display()
            );
            changed = true;
        }
    }
    if changed {
        registry.save()?;
    }
    Ok(())
}

/// Drop registry entries whose project lockfile no longer lists the package.
///
/// Restricted to `packages` when non-empty. Returns what was (or, with
/// `dry_run`, would be) removed.
pub fn clean_installations(
    store: &Store,
    packages: &[String],
    dry_run: bool,
) -> YalcResult<Vec<Installation>> {
    let registry = InstallationsRegistry::load(store)?;
    let mut stale = Vec::new();

    for (name, projects) in registry.entries() {
        if !packages.is_empty() && !packages.contains(name) {
            continue;
        }
        for project in projects {
            let still_used = Lockfile::load(project)
                .map(|lockfile| lockfile.packages.contains_key(name))
                .unwrap_or(false);
            if !still_used {
                stale.push(Installation::new(name.clone(), project.clone()));
            }
        }
    }

    if !dry_run {
        remove_installations(store, &stale)?;
    }
    Ok(stale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::lockfile::LockfileEntry;
    use tempfile::TempDir;

    #[test]
    fn test_add_is_deduplicated() {
        let temp = TempDir::new().unwrap();
        let store = Store::new(temp.path());
        let mut registry = InstallationsRegistry::load(&store).unwrap();
        assert!(registry.add("pkg", Path::new("/p/a")));
        assert!(!registry.add("pkg", Path::new("/p/a")));
        assert!(registry.add("pkg", Path::new("/p/b")));
        assert_eq!(registry.projects("pkg").len(), 2);
    }

    #[test]
    fn test_remove_prunes_empty_package() {
        let mut registry = InstallationsRegistry::default();
        registry.add("pkg", Path::new("/p/a"));
        assert!(registry.remove("pkg", Path::new("/p/a")));
        assert!(registry.is_empty());
        assert!(!registry.remove("pkg", Path::new("/p/a")));
    }

    #[test]
    fn test_persisted_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = Store::new(temp.path());
        add_installations(
            &store,
            &[
                Installation::new("a", "/proj/one"),
                Installation::new("a", "/proj/two"),
                Installation::new("b", "/proj/one"),
            ],
        )
        .unwrap();

        let registry = InstallationsRegistry::load(&store).unwrap();
        assert_eq!(registry.projects("a").len(), 2);

        remove_installations(&store, &[Installation::new("b", "/proj/one")]).unwrap();
        let registry = InstallationsRegistry::load(&store).unwrap();
        assert!(registry.projects("b").is_empty());
        assert!(!registry.entries().contains_key("b"));
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = Store::new(temp.path());
        std::fs::write(store.installations_file(), "not json").unwrap();
        assert!(InstallationsRegistry::load(&store).unwrap().is_empty());
    }

    #[test]
    fn test_clean_removes_stale_projects() {
        let store_dir = TempDir::new().unwrap();
        let live = TempDir::new().unwrap();
        let gone = TempDir::new().unwrap();
        let store = Store::new(store_dir.path());

        let mut lockfile = Lockfile::default();
        lockfile.packages.insert("pkg".to_string(), LockfileEntry::default());
        lockfile.save(live.path()).unwrap();

        add_installations(
            &store,
            &[
                Installation::new("pkg", live.path()),
                Installation::new("pkg", gone.path()),
            ],
        )
        .unwrap();

        let dry = clean_installations(&store, &[], true).unwrap();
        assert_eq!(dry, vec![Installation::new("pkg", gone.path())]);
        assert_eq!(InstallationsRegistry::load(&store).unwrap().projects("pkg").len(), 2);

        clean_installations(&store, &["pkg".to_string()], false).unwrap();
        let registry = InstallationsRegistry::load(&store).unwrap();
        assert_eq!(registry.projects("pkg"), &[live.path().to_path_buf()]);
    }
}
