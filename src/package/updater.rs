//! Refreshing linked packages from the store (`update`, `restore`).

use crate::core::version::PackageRef;
use crate::core::YalcResult;
use crate::package::installer::{AddOptions, PackageInstaller};
use crate::package::lockfile::{LinkMode, Lockfile};
use crate::store::installations::{remove_installations, Installation};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub working_dir: PathBuf,
    /// Re-wire from the existing `.yalc` copies, not the store
    pub restore: bool,
    pub replace: bool,
    /// Run the package manager's update afterwards
    pub update: bool,
    pub scripts: bool,
    /// Leave installations of missing packages alone (used by push)
    pub no_installations_remove: bool,
}

impl UpdateOptions {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            restore: false,
            replace: false,
            update: false,
            scripts: true,
            no_installations_remove: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub updated: Vec<String>,
    /// Requested packages the lockfile does not know about
    pub missing: Vec<Installation>,
}

/// Replay the add flow for locked packages, each group with its recorded mode.
///
/// With no `packages`, every locked package is refreshed. A version given
/// in an argument re-pins the entry.
pub async fn update_packages(
    installer: &PackageInstaller,
    packages: &[PackageRef],
    options: &UpdateOptions,
) -> YalcResult<UpdateReport> {
    let lockfile = Lockfile::load(&options.working_dir)?;
    let mut report = UpdateReport::default();

    let mut targets: Vec<(PackageRef, LinkMode)> = Vec::new();
    if packages.is_empty() {
        for (name, entry) in &lockfile.packages {
            targets.push((
                PackageRef {
                    name: name.clone(),
                    version: entry.version.clone(),
                },
                entry.mode(),
            ));
        }
    } else {
        for package in packages {
            match lockfile.get(&package.name) {
                Some(entry) => targets.push((
                    PackageRef {
                        name: package.name.clone(),
                        version: package.version.clone().or_else(|| entry.version.clone()),
                    },
                    entry.mode(),
                )),
                None => {
                    tracing::warn!(
                        "Did not find package {} in lockfile, please use 'add' command to add it explicitly.",
                        package.name
                    );
                    report
                        .missing
                        .push(Installation::new(package.name.clone(), &options.working_dir));
                }
            }
        }
    }

    for mode in [
        LinkMode::File,
        LinkMode::Symlink {
            rewrite_manifest: false,
        },
        LinkMode::Workspace,
        LinkMode::Symlink {
            rewrite_manifest: true,
        },
        LinkMode::Pure,
    ] {
        let group: Vec<PackageRef> = targets
            .iter()
            .filter(|(_, recorded)| *recorded == mode)
            .map(|(package, _)| package.clone())
            .collect();
        if group.is_empty() {
            continue;
        }

        let add_options = AddOptions {
            working_dir: options.working_dir.clone(),
            mode: Some(mode),
            pure: Some(mode == LinkMode::Pure),
            dev: false,
            restore: options.restore,
            replace: options.replace,
            update: options.update,
            scripts: options.scripts,
        };
        let added = installer.add_packages(&group, &add_options).await?;
        report
            .updated
            .extend(added.added.into_iter().map(|package| package.name));
    }

    if !options.no_installations_remove {
        remove_installations(installer.store(), &report.missing)?;
    }
    Ok(report)
}
