//! Linking stored packages into a consuming project (`add`, `link`).

use crate::core::path::{
    bin_dir, ensure_dir, local_package_dir, node_modules_dir, node_modules_package_dir,
    LOCAL_PACKAGES_FOLDER, SIGNATURE_FILE,
};
use crate::core::version::{validate_package_name, PackageRef};
use crate::core::{YalcError, YalcResult};
use crate::package::lockfile::{LinkMode, Lockfile, LockfileEntry};
use crate::package::manifest::{DependencyKind, PackageManifest};
use crate::package::remover::remove_path;
use crate::scripts::ScriptRunner;
use crate::store::installations::{add_installations, Installation};
use crate::store::Store;
use crate::sync::DirSynchronizer;
use crate::workspace::WorkspaceFinder;
use futures_util::future::join_all;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AddOptions {
    pub working_dir: PathBuf,
    /// Requested wiring. `None` means copy, or pure in a workspace root.
    pub mode: Option<LinkMode>,
    /// `Some(true)` forces pure, `Some(false)` forbids the workspace default
    pub pure: Option<bool>,
    /// Put the dependency in devDependencies
    pub dev: bool,
    /// Use the existing `.yalc` copy instead of the store
    pub restore: bool,
    /// Copy every file instead of diffing against what is there
    pub replace: bool,
    /// Run the package manager's update afterwards
    pub update: bool,
    pub scripts: bool,
}

impl AddOptions {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            mode: None,
            pure: None,
            dev: false,
            restore: false,
            replace: false,
            update: false,
            scripts: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedPackage {
    pub name: String,
    pub version: String,
    pub mode: LinkMode,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AddReport {
    pub added: Vec<AddedPackage>,
    /// Requested packages that could not be found
    pub skipped: Vec<String>,
    /// Packages that errored while staging or wiring; the rest of the
    /// batch is still recorded
    pub failed: Vec<String>,
}

/// Pick the one link mode used for a whole add batch.
pub fn resolve_mode(options: &AddOptions, manifest: &PackageManifest) -> LinkMode {
    match options.pure {
        Some(true) => LinkMode::Pure,
        Some(false) => options.mode.unwrap_or(LinkMode::File),
        None => match WorkspaceFinder::marker(&options.working_dir, manifest) {
            Some(marker) => {
                tracing::warn!(
                    "Because of {} --pure option will be used by default, to override use --no-pure.",
                    marker.describe()
                );
                LinkMode::Pure
            }
            None => options.mode.unwrap_or(LinkMode::File),
        },
    }
}

/// Copies packages from the store into projects and wires them up.
#[derive(Debug, Clone)]
pub struct PackageInstaller {
    store: Store,
    sync: DirSynchronizer,
}

impl PackageInstaller {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            sync: DirSynchronizer::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Add `packages` to the project in `options.working_dir`.
    pub async fn add_packages(
        &self,
        packages: &[PackageRef],
        options: &AddOptions,
    ) -> YalcResult<AddReport> {
        let mut report = AddReport::default();
        if packages.is_empty() {
            return Ok(report);
        }

        let working_dir = options.working_dir.as_path();
        let mut manifest = PackageManifest::load(working_dir)?;
        let mode = resolve_mode(options, &manifest);

        if options.scripts {
            ScriptRunner::run_if_present(&manifest, "preyalc", working_dir)?;
            for package in packages {
                ScriptRunner::run_if_present(
                    &manifest,
                    &format!("preyalc.{}", package),
                    working_dir,
                )?;
            }
        }

        let staged = join_all(
            packages
                .iter()
                .map(|package| self.stage_package(package, options)),
        )
        .await;

        let mut lockfile = Lockfile::load(working_dir)?;
        let mut manifest_changed = false;
        let mut installations = Vec::new();

        for (package, staged) in packages.iter().zip(staged) {
            let package_manifest = match staged {
                Ok(Some(package_manifest)) => package_manifest,
                Ok(None) => {
                    report.skipped.push(package.to_string());
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Could not add package `{}`: {}", package, e);
                    report.failed.push(package.to_string());
                    continue;
                }
            };
            let name = package.name.as_str();
            let copy_dir = local_package_dir(working_dir, name);

            let mut replaced = None;
            if mode == LinkMode::Pure {
                tracing::info!(
                    "{}@{} added to {}/{} purely",
                    package_manifest.name(),
                    package_manifest.version(),
                    LOCAL_PACKAGES_FOLDER,
                    name
                );
            } else {
                let modules_dir = node_modules_package_dir(working_dir, name);
                if let Err(e) = self
                    .wire_node_modules(working_dir, &copy_dir, &modules_dir, mode, options.replace)
                    .await
                {
                    tracing::warn!(
                        "Could not link package `{}` into {}: {}",
                        package,
                        modules_dir.display(),
                        e
                    );
                    report.failed.push(package.to_string());
                    continue;
                }

                if let Some(address) = mode.manifest_address(name) {
                    let (changed, previous) =
                        point_dependency_at(&mut manifest, name, &address, options.dev);
                    manifest_changed |= changed;
                    replaced = previous;
                }

                if mode.is_symlink() {
                    link_bins(working_dir, &copy_dir, &package_manifest);
                }

                let action = if mode
                    == (LinkMode::Symlink {
                        rewrite_manifest: false,
                    }) {
                    "linked"
                } else {
                    "added"
                };
                tracing::info!(
                    "Package {}@{} {} ==> {}",
                    package_manifest.name(),
                    package_manifest.version(),
                    action,
                    modules_dir.display()
                );
            }

            let signature = read_signature(&copy_dir);
            let mut entry = LockfileEntry::new(mode);
            entry.version = package.version.clone();
            entry.signature = signature.clone();
            entry.replaced = replaced;
            lockfile.upsert(name, entry);

            if options.scripts {
                ScriptRunner::run_if_present(&manifest, &format!("postyalc.{}", package), working_dir)?;
            }

            installations.push(Installation::new(name, working_dir));
            report.added.push(AddedPackage {
                name: name.to_string(),
                version: package_manifest.version().to_string(),
                mode,
                signature,
            });
        }

        if manifest_changed {
            manifest.save(working_dir)?;
        }
        if !report.added.is_empty() {
            lockfile.save(working_dir)?;
        }
        if options.scripts {
            ScriptRunner::run_if_present(&manifest, "postyalc", working_dir)?;
        }
        add_installations(&self.store, &installations)?;

        if options.update && !report.added.is_empty() {
            let names: Vec<String> = report.added.iter().map(|p| p.name.clone()).collect();
            ScriptRunner::update_packages(working_dir, &names)?;
        }

        Ok(report)
    }

    /// Bring `.yalc/<name>` up to date and read its manifest.
    ///
    /// `Ok(None)` means the package is unavailable and was skipped.
    async fn stage_package(
        &self,
        package: &PackageRef,
        options: &AddOptions,
    ) -> YalcResult<Option<PackageManifest>> {
        validate_package_name(&package.name)?;
        let copy_dir = local_package_dir(&options.working_dir, &package.name);

        if options.restore {
            tracing::info!("Restoring package `{}` from .yalc directory", package);
            if !copy_dir.is_dir() {
                tracing::warn!(
                    "Could not find package `{}` {}, skipping.",
                    package,
                    copy_dir.display()
                );
                return Ok(None);
            }
        } else {
            let package_dir = self.store.package_dir(&package.name);
            if !package_dir.is_dir() {
                tracing::warn!(
                    "Could not find package `{}` in store ({}), skipping.",
                    package.name,
                    package_dir.display()
                );
                return Ok(None);
            }
            let version = match &package.version {
                Some(version) => version.clone(),
                None => self.store.latest_version(&package.name).unwrap_or_default(),
            };
            let version_dir = self.store.version_dir(&package.name, &version);
            if version.is_empty() || !version_dir.is_dir() {
                tracing::warn!(
                    "Could not find package `{}` {}, skipping.",
                    package,
                    version_dir.display()
                );
                return Ok(None);
            }
            self.sync
                .sync(&version_dir, &copy_dir, !options.replace)
                .await?;
        }

        Ok(PackageManifest::load_valid(&copy_dir))
    }

    async fn wire_node_modules(
        &self,
        working_dir: &Path,
        copy_dir: &Path,
        modules_dir: &Path,
        mode: LinkMode,
        replace: bool,
    ) -> YalcResult<()> {
        if mode.is_symlink() || is_symlink(modules_dir) {
            remove_path(&node_modules_dir(working_dir), modules_dir)?;
        }
        if mode.is_symlink() {
            if let Some(parent) = modules_dir.parent() {
                ensure_dir(parent)?;
            }
            symlink_dir(copy_dir, modules_dir)?;
        } else {
            self.sync.sync(copy_dir, modules_dir, !replace).await?;
        }
        Ok(())
    }
}

/// Point `name` at `address` in the manifest.
///
/// `dev` moves an existing regular dependency to devDependencies. Without
/// `dev`, a name that only exists in devDependencies stays there. Returns
/// whether the manifest changed and the specifier that was replaced.
fn point_dependency_at(
    manifest: &mut PackageManifest,
    name: &str,
    address: &str,
    dev: bool,
) -> (bool, Option<String>) {
    let mut changed = false;
    let mut replaced = None;

    let kind = if dev {
        if let Some(previous) = manifest.remove_dependency(DependencyKind::Regular, name) {
            replaced = Some(previous);
            changed = true;
        }
        DependencyKind::Dev
    } else if manifest.dependency(DependencyKind::Regular, name).is_none()
        && manifest.dependency(DependencyKind::Dev, name).is_some()
    {
        DependencyKind::Dev
    } else {
        DependencyKind::Regular
    };

    let current = manifest.dependency(kind, name).map(str::to_string);
    if current.as_deref() != Some(address) {
        replaced = replaced.or(current);
        manifest.set_dependency(kind, name, address);
        changed = true;
    }

    if replaced.as_deref() == Some(address) {
        replaced = None;
    }
    (changed, replaced)
}

fn link_bins(working_dir: &Path, copy_dir: &Path, package: &PackageManifest) {
    let bins = package.bin();
    if bins.is_empty() {
        return;
    }
    let bin_dir = bin_dir(working_dir);
    for (command, target) in bins {
        let source = copy_dir.join(&target);
        let dest = bin_dir.join(&command);
        tracing::info!(
            "Linking bin script: {} -> {}",
            relative_display(&source, working_dir),
            relative_display(&dest, working_dir)
        );
        if let Err(e) = link_bin(&bin_dir, &source, &dest) {
            tracing::warn!("Could not create bin symlink {}: {}", dest.display(), e);
        }
    }
}

fn link_bin(bin_dir: &Path, source: &Path, dest: &Path) -> YalcResult<()> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    remove_path(bin_dir, dest)?;
    symlink_file(source, dest)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(source, fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

fn relative_display(path: &Path, base: &Path) -> String {
    pathdiff::diff_paths(path, base)
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

fn read_signature(copy_dir: &Path) -> Option<String> {
    fs::read_to_string(copy_dir.join(SIGNATURE_FILE))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> YalcResult<()> {
    std::os::unix::fs::symlink(target, link)
        .map_err(|e| YalcError::Path(format!("Failed to link {}: {}", link.display(), e)))
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> YalcResult<()> {
    std::os::windows::fs::symlink_dir(target, link)
        .map_err(|e| YalcError::Path(format!("Failed to link {}: {}", link.display(), e)))
}

#[cfg(unix)]
fn symlink_file(target: &Path, link: &Path) -> YalcResult<()> {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(windows)]
fn symlink_file(target: &Path, link: &Path) -> YalcResult<()> {
    std::os::windows::fs::symlink_file(target, link)?;
    Ok(())
}
