//! Unlinking packages from a project (`remove` and `retreat`).

use crate::core::path::{
    local_package_dir, local_packages_dir, node_modules_dir, node_modules_package_dir,
};
use crate::core::version::{validate_package_name, PackageRef};
use crate::core::{YalcError, YalcResult};
use crate::package::lockfile::{LinkMode, Lockfile};
use crate::package::manifest::{DependencyKind, PackageManifest};
use crate::store::installations::{remove_installations, Installation};
use crate::store::Store;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RemoveOptions {
    pub working_dir: PathBuf,
    /// With no packages given, remove everything in the lockfile
    pub all: bool,
    /// Keep the lockfile entry and `.yalc` copy so `restore` can undo it
    pub retreat: bool,
}

impl RemoveOptions {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            all: false,
            retreat: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveReport {
    /// Packages that were targeted
    pub removed: Vec<String>,
    /// Packages whose manifest entry was restored or dropped
    pub restored_in_manifest: Vec<String>,
    pub lockfile_deleted: bool,
}

/// Remove (or retreat) packages from the project at `options.working_dir`.
pub fn remove_packages(
    store: &Store,
    packages: &[PackageRef],
    options: &RemoveOptions,
) -> YalcResult<RemoveReport> {
    let working_dir = options.working_dir.as_path();
    let mut lockfile = Lockfile::load(working_dir)?;
    let mut manifest = PackageManifest::load(working_dir)?;
    let mut report = RemoveReport::default();

    let targets = select_targets(&lockfile, packages, options.all);
    if targets.is_empty() {
        return Ok(report);
    }

    let mut lockfile_changed = false;
    let mut manifest_changed = false;
    let mut unwire = Vec::new();

    for name in &targets {
        let entry = lockfile.get(name).cloned();
        let mode = entry.as_ref().map(|entry| entry.mode());

        if let Some(kind) = owning_dependency_kind(&manifest, name) {
            let current = manifest.dependency(kind, name).unwrap_or_default().to_string();
            if is_local_address(&current, name, mode) {
                let replaced = entry.as_ref().and_then(|entry| entry.replaced.clone());
                match replaced {
                    Some(previous) => manifest.set_dependency(kind, name, &previous),
                    None => {
                        manifest.remove_dependency(kind, name);
                    }
                }
                manifest_changed = true;
                report.restored_in_manifest.push(name.clone());
                unwire.push(name.clone());
            }
        }

        // `link` leaves the manifest alone but still owns node_modules
        if mode
            == Some(LinkMode::Symlink {
                rewrite_manifest: false,
            })
            && !unwire.contains(name)
        {
            unwire.push(name.clone());
        }

        if options.retreat {
            let replaced = entry
                .as_ref()
                .and_then(|entry| entry.replaced.as_deref())
                .unwrap_or("");
            tracing::info!("Retreating package {} version ==> {}", name, replaced);
        } else if lockfile.remove(name).is_some() {
            lockfile_changed = true;
        }
        report.removed.push(name.clone());
    }

    if lockfile_changed {
        lockfile.save(working_dir)?;
    }
    if manifest_changed {
        manifest.save(working_dir)?;
    }

    let modules_root = node_modules_dir(working_dir);
    for name in &unwire {
        remove_path(&modules_root, &node_modules_package_dir(working_dir, name))?;
    }

    if !options.retreat {
        let local_root = local_packages_dir(working_dir);
        for name in &targets {
            remove_path(&local_root, &local_package_dir(working_dir, name))?;
        }
    }
    remove_empty_scopes(&local_packages_dir(working_dir), &targets)?;

    if lockfile.is_empty() && !options.retreat {
        Lockfile::delete(working_dir)?;
        report.lockfile_deleted = true;
        let local = local_packages_dir(working_dir);
        if !remove_dir_if_empty(&local)? && local.exists() {
            tracing::warn!("{} is not empty, not removing it", local.display());
        }
    }

    if !options.retreat {
        let installations: Vec<Installation> = targets
            .iter()
            .map(|name| Installation::new(name.clone(), working_dir))
            .collect();
        remove_installations(store, &installations)?;
    }

    Ok(report)
}

/// Names to act on. A version in the argument must match the locked one;
/// names missing from the lockfile are still attempted.
fn select_targets(lockfile: &Lockfile, packages: &[PackageRef], all: bool) -> Vec<String> {
    if packages.is_empty() {
        if all {
            return lockfile
                .packages
                .keys()
                .filter(|name| usable_name(name))
                .cloned()
                .collect();
        }
        tracing::info!("Use --all option to remove all packages.");
        return Vec::new();
    }

    let mut targets = Vec::new();
    for package in packages {
        if !usable_name(&package.name) {
            continue;
        }
        match lockfile.get(&package.name) {
            Some(entry) => {
                let matches = match &package.version {
                    None => true,
                    Some(version) => entry.version.as_deref() == Some(version.as_str()),
                };
                if matches {
                    targets.push(package.name.clone());
                }
            }
            None => {
                tracing::warn!(
                    "Package {} not found in yalc.lock, still will try to remove.",
                    package
                );
                targets.push(package.name.clone());
            }
        }
    }
    targets.dedup();
    targets
}

fn usable_name(name: &str) -> bool {
    match validate_package_name(name) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("{}, skipping.", e);
            false
        }
    }
}

/// devDependencies wins when a name appears in both tables.
fn owning_dependency_kind(manifest: &PackageManifest, name: &str) -> Option<DependencyKind> {
    [DependencyKind::Dev, DependencyKind::Regular]
        .into_iter()
        .find(|kind| manifest.dependency(*kind, name).is_some())
}

/// Whether `spec` is an address this tool wrote for `name`.
pub fn is_local_address(spec: &str, name: &str, mode: Option<LinkMode>) -> bool {
    let target = format!(".yalc/{}", name);
    let path = spec
        .strip_prefix("file:")
        .or_else(|| spec.strip_prefix("link:"))
        .map(|rest| rest.strip_prefix("./").unwrap_or(rest));
    if path == Some(target.as_str()) {
        return true;
    }
    spec == "workspace:*" && mode == Some(LinkMode::Workspace)
}

/// Remove a file, symlink or directory tree strictly inside `root`.
/// Missing paths are fine.
pub(crate) fn remove_path(root: &Path, path: &Path) -> YalcResult<()> {
    if !is_strictly_inside(root, path) {
        return Err(YalcError::Path(format!(
            "Refusing to remove {} outside of {}",
            path.display(),
            root.display()
        )));
    }
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else if let Err(e) = fs::remove_file(path) {
        // Windows junctions report as files but need remove_dir
        if cfg!(windows) {
            fs::remove_dir(path)?;
        } else {
            return Err(e.into());
        }
    }
    Ok(())
}

/// `path` names something below `root` using only plain components.
fn is_strictly_inside(root: &Path, path: &Path) -> bool {
    match path.strip_prefix(root) {
        Ok(rest) => {
            let mut components = rest.components().peekable();
            components.peek().is_some()
                && components.all(|component| matches!(component, Component::Normal(_)))
        }
        Err(_) => false,
    }
}

fn remove_dir_if_empty(dir: &Path) -> YalcResult<bool> {
    match fs::read_dir(dir) {
        Ok(mut entries) => {
            if entries.next().is_none() {
                fs::remove_dir(dir)?;
                Ok(true)
            } else {
                Ok(false)
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn remove_empty_scopes(local_dir: &Path, names: &[String]) -> YalcResult<()> {
    for name in names {
        if let Some((scope, _)) = name.split_once('/') {
            if scope.starts_with('@') {
                remove_dir_if_empty(&local_dir.join(scope))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::lockfile::LockfileEntry;
    use crate::store::installations::{add_installations, InstallationsRegistry};
    use tempfile::TempDir;

    fn project_with(name: &str, mode: LinkMode, replaced: Option<&str>) -> (TempDir, Store) {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("app");
        fs::create_dir_all(local_package_dir(&project, name)).unwrap();
        fs::create_dir_all(node_modules_package_dir(&project, name)).unwrap();
        fs::write(local_package_dir(&project, name).join("index.js"), "x").unwrap();

        let mut manifest = PackageManifest::new("app", "1.0.0");
        if let Some(address) = mode.manifest_address(name) {
            manifest.set_dependency(DependencyKind::Regular, name, &address);
        }
        manifest.save(&project).unwrap();

        let mut entry = LockfileEntry::new(mode);
        entry.version = Some("1.0.0".to_string());
        entry.replaced = replaced.map(str::to_string);
        let mut lockfile = Lockfile::default();
        lockfile.upsert(name, entry);
        lockfile.save(&project).unwrap();

        let store = Store::new(temp.path().join("store"));
        add_installations(&store, &[Installation::new(name, &project)]).unwrap();
        (temp, store)
    }

    #[test]
    fn test_remove_restores_replaced_version() {
        let (temp, store) = project_with("dep", LinkMode::File, Some("^1.0.0"));
        let project = temp.path().join("app");

        let report = remove_packages(
            &store,
            &[PackageRef::parse("dep").unwrap()],
            &RemoveOptions::new(&project),
        )
        .unwrap();

        assert_eq!(report.removed, vec!["dep".to_string()]);
        let manifest = PackageManifest::load(&project).unwrap();
        assert_eq!(manifest.dependency(DependencyKind::Regular, "dep"), Some("^1.0.0"));
        assert!(!node_modules_package_dir(&project, "dep").exists());
        assert!(!local_package_dir(&project, "dep").exists());
        assert!(!Lockfile::exists(&project));
        assert!(!local_packages_dir(&project).exists());
        assert!(report.lockfile_deleted);
        assert!(InstallationsRegistry::load(&store).unwrap().is_empty());
    }

    #[test]
    fn test_remove_without_replaced_drops_dependency() {
        let (temp, store) = project_with("dep", LinkMode::File, None);
        let project = temp.path().join("app");

        remove_packages(&store, &[PackageRef::parse("dep").unwrap()], &RemoveOptions::new(&project))
            .unwrap();

        let manifest = PackageManifest::load(&project).unwrap();
        assert_eq!(manifest.dependency(DependencyKind::Regular, "dep"), None);
        assert!(manifest.get("dependencies").is_none());
    }

    #[test]
    fn test_retreat_keeps_lockfile_and_local_copy() {
        let (temp, store) = project_with("dep", LinkMode::File, Some("^1.0.0"));
        let project = temp.path().join("app");
        let mut options = RemoveOptions::new(&project);
        options.retreat = true;

        remove_packages(&store, &[PackageRef::parse("dep").unwrap()], &options).unwrap();

        let manifest = PackageManifest::load(&project).unwrap();
        assert_eq!(manifest.dependency(DependencyKind::Regular, "dep"), Some("^1.0.0"));
        assert!(!node_modules_package_dir(&project, "dep").exists());
        assert!(local_package_dir(&project, "dep").join("index.js").exists());
        assert!(Lockfile::load(&project).unwrap().get("dep").is_some());
        let registry = InstallationsRegistry::load(&store).unwrap();
        assert_eq!(registry.projects("dep").len(), 1);
    }

    #[test]
    fn test_version_mismatch_is_skipped() {
        let (temp, store) = project_with("dep", LinkMode::File, None);
        let project = temp.path().join("app");

        let report = remove_packages(
            &store,
            &[PackageRef::parse("dep@2.0.0").unwrap()],
            &RemoveOptions::new(&project),
        )
        .unwrap();

        assert!(report.removed.is_empty());
        assert!(Lockfile::load(&project).unwrap().get("dep").is_some());
    }

    #[test]
    fn test_no_packages_without_all_does_nothing() {
        let (temp, store) = project_with("dep", LinkMode::File, None);
        let project = temp.path().join("app");

        let report = remove_packages(&store, &[], &RemoveOptions::new(&project)).unwrap();
        assert!(report.removed.is_empty());
        assert!(Lockfile::exists(&project));

        let mut options = RemoveOptions::new(&project);
        options.all = true;
        let report = remove_packages(&store, &[], &options).unwrap();
        assert_eq!(report.removed, vec!["dep".to_string()]);
        assert!(!Lockfile::exists(&project));
    }

    #[test]
    fn test_remove_scoped_prunes_scope_dir() {
        let (temp, store) = project_with("@scope/dep", LinkMode::File, None);
        let project = temp.path().join("app");

        remove_packages(
            &store,
            &[PackageRef::parse("@scope/dep").unwrap()],
            &RemoveOptions::new(&project),
        )
        .unwrap();

        assert!(!local_packages_dir(&project).join("@scope").exists());
    }

    #[test]
    fn test_dot_dot_name_leaves_project_alone() {
        let (temp, store) = project_with("other", LinkMode::File, None);
        let project = temp.path().join("app");
        fs::create_dir_all(project.join("src")).unwrap();
        fs::write(project.join("src").join("main.js"), "main").unwrap();

        let traversal = ["..", ".", "../src", "@scope/..", ""].map(|name| PackageRef {
            name: name.to_string(),
            version: None,
        });
        let report = remove_packages(&store, &traversal, &RemoveOptions::new(&project)).unwrap();

        assert!(report.removed.is_empty());
        assert!(project.join("src").join("main.js").exists());
        assert!(local_package_dir(&project, "other").join("index.js").exists());
        assert!(Lockfile::load(&project).unwrap().get("other").is_some());
    }

    #[test]
    fn test_remove_path_stays_inside_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".yalc");
        fs::create_dir_all(root.join("dep")).unwrap();
        fs::write(temp.path().join("keep.txt"), "keep").unwrap();

        assert!(remove_path(&root, &root.join("..")).is_err());
        assert!(remove_path(&root, &root).is_err());
        assert!(remove_path(&root, &temp.path().join("keep.txt")).is_err());
        assert!(temp.path().join("keep.txt").exists());

        remove_path(&root, &root.join("dep")).unwrap();
        assert!(!root.join("dep").exists());
        remove_path(&root, &root.join("missing")).unwrap();
    }

    #[test]
    fn test_is_local_address() {
        assert!(is_local_address("file:.yalc/dep", "dep", None));
        assert!(is_local_address("link:./.yalc/dep", "dep", None));
        assert!(!is_local_address("^1.0.0", "dep", None));
        assert!(!is_local_address("workspace:*", "dep", Some(LinkMode::File)));
        assert!(is_local_address("workspace:*", "dep", Some(LinkMode::Workspace)));
    }
}
