use crate::core::path::{CATALOG_FILE, MANIFEST_FILE};
use crate::package::manifest::PackageManifest;
use std::path::{Path, PathBuf};

/// What makes a directory a monorepo root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceMarker {
    /// `workspaces` field in package.json
    ManifestWorkspaces,
    /// `pnpm-workspace.yaml` next to package.json
    PnpmWorkspace,
}

impl WorkspaceMarker {
    pub fn describe(self) -> &'static str {
        match self {
            WorkspaceMarker::ManifestWorkspaces => "`workspaces` enabled in this package",
            WorkspaceMarker::PnpmWorkspace => "`pnpm-workspace.yaml` exists in this package",
        }
    }
}

/// Detects workspace roots.
pub struct WorkspaceFinder;

impl WorkspaceFinder {
    /// Marker of `dir` itself, checking the manifest first.
    pub fn marker(dir: &Path, manifest: &PackageManifest) -> Option<WorkspaceMarker> {
        if manifest.has_workspaces() {
            Some(WorkspaceMarker::ManifestWorkspaces)
        } else if dir.join(CATALOG_FILE).is_file() {
            Some(WorkspaceMarker::PnpmWorkspace)
        } else {
            None
        }
    }

    pub fn is_workspace_root(dir: &Path, manifest: &PackageManifest) -> bool {
        Self::marker(dir, manifest).is_some()
    }

    /// Nearest ancestor of `start_dir` (inclusive) that is a workspace root.
    pub fn find_workspace_root(start_dir: &Path) -> Option<PathBuf> {
        start_dir
            .ancestors()
            .filter(|dir| dir.join(MANIFEST_FILE).is_file())
            .find(|dir| {
                PackageManifest::load(dir)
                    .map(|manifest| Self::is_workspace_root(dir, &manifest))
                    .unwrap_or(false)
            })
            .map(Path::to_path_buf)
    }
}
