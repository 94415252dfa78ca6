//! Rewrites protocol specifiers in a manifest into concrete versions

use crate::package::manifest::{DependencyKind, PackageManifest};
use crate::resolver::catalog::{is_catalog_dependency, resolve_catalog_dependency, CatalogCache};
use crate::resolver::workspace_protocol::{is_workspace_dependency, resolve_workspace_dependency};
use std::path::Path;

/// Resolves `workspace:` and `catalog:` specifiers.
///
/// Holds the catalog cache so one resolver can serve many packages in a
/// long-lived process.
#[derive(Debug, Default)]
pub struct DependencyResolver {
    catalogs: CatalogCache,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(catalogs: CatalogCache) -> Self {
        Self { catalogs }
    }

    pub fn catalogs(&self) -> &CatalogCache {
        &self.catalogs
    }

    /// Rewrite regular, dev and peer dependency tables of `manifest`.
    ///
    /// Never fails; unresolvable entries fall back as described on
    /// [`resolve_workspace_dependency`] and [`resolve_catalog_dependency`].
    pub fn resolve_manifest(&self, mut manifest: PackageManifest, working_dir: &Path) -> PackageManifest {
        let needs_catalog = DependencyKind::ALL.iter().any(|kind| {
            manifest
                .dependencies(*kind)
                .iter()
                .any(|(_, spec)| is_catalog_dependency(spec))
        });
        let catalog = needs_catalog.then(|| self.catalogs.get(working_dir));

        for kind in DependencyKind::ALL {
            manifest.map_dependencies(kind, |name, spec| {
                if is_workspace_dependency(spec) {
                    let resolved = resolve_workspace_dependency(spec, name, working_dir);
                    tracing::info!("Resolving workspace package {} version ==> {}", name, resolved);
                    Some(resolved)
                } else if let (true, Some(catalog)) = (is_catalog_dependency(spec), &catalog) {
                    let resolved = resolve_catalog_dependency(spec, name, catalog);
                    tracing::info!("Resolving catalog package {} ({}) ==> {}", name, spec, resolved);
                    Some(resolved)
                } else {
                    None
                }
            });
        }
        manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_manifest_rewrites_all_tables() {
        let temp = TempDir::new().unwrap();
        let sibling = temp.path().join("node_modules").join("shared");
        fs::create_dir_all(&sibling).unwrap();
        fs::write(
            sibling.join("package.json"),
            r#"{"name":"shared","version":"3.1.0"}"#,
        )
        .unwrap();
        fs::write(
            temp.path().join("pnpm-workspace.yaml"),
            "catalog:\n  react: ^18.2.0\ncatalogs:\n  tools:\n    typescript: 5.4.0\n",
        )
        .unwrap();

        let mut manifest = PackageManifest::new("app", "1.0.0");
        manifest.set_dependency(DependencyKind::Regular, "shared", "workspace:^");
        manifest.set_dependency(DependencyKind::Regular, "lodash", "^4.17.21");
        manifest.set_dependency(DependencyKind::Peer, "react", "catalog:");
        manifest.set_dependency(DependencyKind::Dev, "typescript", "catalog:tools");

        let resolved = DependencyResolver::new().resolve_manifest(manifest, temp.path());

        assert_eq!(resolved.dependency(DependencyKind::Regular, "shared"), Some("^3.1.0"));
        assert_eq!(resolved.dependency(DependencyKind::Regular, "lodash"), Some("^4.17.21"));
        assert_eq!(resolved.dependency(DependencyKind::Peer, "react"), Some("^18.2.0"));
        assert_eq!(resolved.dependency(DependencyKind::Dev, "typescript"), Some("5.4.0"));
    }

    #[test]
    fn test_no_catalog_lookup_without_catalog_specs() {
        let temp = TempDir::new().unwrap();
        let resolver = DependencyResolver::new();
        let mut manifest = PackageManifest::new("app", "1.0.0");
        manifest.set_dependency(DependencyKind::Regular, "x", "1.0.0");
        resolver.resolve_manifest(manifest, temp.path());
        assert!(resolver.catalogs().is_empty());
    }
}
