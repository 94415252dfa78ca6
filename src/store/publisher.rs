//! Publishing a package directory into the store, and pushing it onward.

use crate::config::Config;
use crate::core::path::SIGNATURE_FILE;
use crate::core::version::PackageRef;
use crate::core::{YalcError, YalcResult};
use crate::package::installer::PackageInstaller;
use crate::package::manifest::PackageManifest;
use crate::package::signature::{file_digest_async, short_signature, sorted_signature};
use crate::package::updater::{update_packages, UpdateOptions};
use crate::resolver::DependencyResolver;
use crate::scripts::ScriptRunner;
use crate::store::installations::{remove_installations, InstallationsRegistry};
use crate::store::packlist::package_files;
use crate::store::Store;
use crate::sync::copy_all;
use futures_util::future::join_all;
use serde_json::Value;
use std::path::{Path, PathBuf};

const PRE_PUBLISH_SCRIPTS: &[&str] = &[
    "prepublish",
    "prepare",
    "prepublishOnly",
    "prepack",
    "preyalcpublish",
];

const POST_PUBLISH_SCRIPTS: &[&str] = &["postyalcpublish", "postpack", "publish", "postpublish"];

/// Scripts stripped from the stored manifest when dev fields are dropped.
const DEV_ONLY_SCRIPTS: &[&str] = &["prepare", "prepublish"];

#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub working_dir: PathBuf,
    /// Publish even with `private: true`
    pub private: bool,
    /// Skip when the content signature matches the stored one
    pub changed: bool,
    /// Print the packed file list
    pub content: bool,
    /// Update every project that consumes the package afterwards
    pub push: bool,
    pub replace: bool,
    pub update: bool,
    pub scripts: bool,
    /// Suffix the stored version with `+<short signature>`
    pub sig: bool,
    pub workspace_resolve: bool,
    /// Drop devDependencies and dev-only scripts from the stored manifest
    pub dev_mod: bool,
}

impl PublishOptions {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(working_dir, &Config::default())
    }

    pub fn from_config(working_dir: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            working_dir: working_dir.into(),
            private: false,
            changed: false,
            content: false,
            push: false,
            replace: false,
            update: false,
            scripts: config.scripts,
            sig: config.sig,
            workspace_resolve: config.workspace_resolve,
            dev_mod: config.dev_mod,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published {
        name: String,
        /// Version as stored, including any signature suffix
        version: String,
        signature: String,
        /// Projects the package was pushed to
        pushed: usize,
    },
    /// `changed` was requested and nothing differed
    Unchanged { name: String, version: String },
    SkippedPrivate { name: String },
}

/// Copies packages into the store.
#[derive(Debug)]
pub struct Publisher {
    store: Store,
    resolver: DependencyResolver,
}

impl Publisher {
    pub fn new(store: Store) -> Self {
        Self::with_resolver(store, DependencyResolver::new())
    }

    pub fn with_resolver(store: Store, resolver: DependencyResolver) -> Self {
        Self { store, resolver }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Publish the package in `options.working_dir`.
    pub async fn publish(&self, options: &PublishOptions) -> YalcResult<PublishOutcome> {
        let working_dir = options.working_dir.as_path();
        let manifest = PackageManifest::load(working_dir)?;

        if manifest.is_private() && !options.private {
            tracing::info!(
                "Will not publish package with `private: true` use --private flag to force publishing."
            );
            return Ok(PublishOutcome::SkippedPrivate {
                name: manifest.name().to_string(),
            });
        }

        if options.scripts {
            ScriptRunner::run_all(&manifest, PRE_PUBLISH_SCRIPTS, working_dir)?;
        }

        // Pre-publish scripts may have rewritten the manifest.
        let manifest = PackageManifest::load(working_dir)?;
        let copied = self.copy_package_to_store(&manifest, options).await?;
        let Some(signature) = copied else {
            tracing::warn!("Package content has not changed, skipping publishing.");
            return Ok(PublishOutcome::Unchanged {
                name: manifest.name().to_string(),
                version: manifest.version().to_string(),
            });
        };

        if options.scripts {
            ScriptRunner::run_all(&manifest, POST_PUBLISH_SCRIPTS, working_dir)?;
        }

        let version_dir = self.store.version_dir(manifest.name(), manifest.version());
        let stored = PackageManifest::load(&version_dir)?;
        tracing::info!("{}@{} published in store.", stored.name(), stored.version());

        let pushed = if options.push {
            self.push(manifest.name(), manifest.version(), options).await?
        } else {
            0
        };

        Ok(PublishOutcome::Published {
            name: stored.name().to_string(),
            version: stored.version().to_string(),
            signature,
            pushed,
        })
    }

    /// Copy the packed files of `manifest` into
    /// `<store>/packages/<name>/<version>/`.
    ///
    /// Returns the content signature, or `None` when `options.changed` is
    /// set and the stored signature already matches.
    pub async fn copy_package_to_store(
        &self,
        manifest: &PackageManifest,
        options: &PublishOptions,
    ) -> YalcResult<Option<String>> {
        let working_dir = options.working_dir.as_path();
        let packlist = package_files(working_dir, manifest)?;
        let files = packlist.files;

        if options.content {
            println!("Files included in published content:");
            for file in &files {
                println!("- {}", file.display());
            }
            println!("Total {} files.", files.len());
        }

        let digests = join_all(
            files
                .iter()
                .map(|rel| file_digest_async(working_dir.join(rel), rel.clone())),
        )
        .await
        .into_iter()
        .collect::<YalcResult<Vec<_>>>()?;
        let signature = sorted_signature(digests)?;

        let version_dir = self.store.version_dir(manifest.name(), manifest.version());
        if options.changed
            && self.store.read_signature(manifest.name(), manifest.version()).as_deref()
                == Some(signature.as_str())
        {
            return Ok(None);
        }

        remove_dir_if_present(&version_dir).await?;
        let report = copy_all(working_dir, &version_dir, &files).await;
        if report.errors > 0 {
            return Err(YalcError::Store(format!(
                "Failed to copy {} file(s) of {} into the store",
                report.errors,
                manifest.name()
            )));
        }
        tokio::fs::write(version_dir.join(SIGNATURE_FILE), &signature).await?;

        let stored = self.stored_manifest(manifest.clone(), &signature, options);
        stored.save(&version_dir)?;
        Ok(Some(signature))
    }

    fn stored_manifest(
        &self,
        mut manifest: PackageManifest,
        signature: &str,
        options: &PublishOptions,
    ) -> PackageManifest {
        if options.dev_mod {
            manifest.remove_field("devDependencies");
            for script in DEV_ONLY_SCRIPTS {
                manifest.remove_script(script);
            }
        }
        if options.workspace_resolve {
            manifest = self.resolver.resolve_manifest(manifest, &options.working_dir);
        }
        if options.sig {
            let version = format!("{}+{}", manifest.version(), short_signature(signature));
            manifest.set_version(&version);
        }
        manifest.set_field("yalcSig", Value::String(signature.to_string()));
        manifest
    }

    /// Refresh every project registered as consuming `name`.
    ///
    /// Projects whose lockfile no longer lists the package are dropped
    /// from the installations registry. Returns how many were updated.
    pub async fn push(
        &self,
        name: &str,
        version: &str,
        options: &PublishOptions,
    ) -> YalcResult<usize> {
        let registry = InstallationsRegistry::load(&self.store)?;
        let projects = registry.projects(name).to_vec();
        let installer = PackageInstaller::new(self.store.clone());
        let package = PackageRef::parse(name)?;

        let mut pushed = 0;
        let mut stale = Vec::new();
        for project in projects {
            tracing::info!("Pushing {}@{} in {}", name, version, project.display());
            let mut update = UpdateOptions::new(&project);
            update.replace = options.replace;
            update.update = options.update;
            update.scripts = options.scripts;
            update.no_installations_remove = true;

            match update_packages(&installer, std::slice::from_ref(&package), &update).await {
                Ok(report) => {
                    if !report.updated.is_empty() {
                        pushed += 1;
                    }
                    stale.extend(report.missing);
                }
                Err(e) => {
                    tracing::warn!("Could not push {} to {}: {}", name, project.display(), e);
                }
            }
        }
        remove_installations(&self.store, &stale)?;
        Ok(pushed)
    }
}

async fn remove_dir_if_present(dir: &Path) -> YalcResult<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
