use crate::core::path::{node_modules_package_dir, MANIFEST_FILE};
use crate::package::manifest::PackageManifest;
use std::path::Path;

pub const WORKSPACE_PREFIX: &str = "workspace:";

pub fn is_workspace_dependency(spec: &str) -> bool {
    spec.starts_with(WORKSPACE_PREFIX)
}

/// Resolve a `workspace:` specifier to a concrete version.
///
/// `*` becomes the sibling's installed version, `^`/`~` re-prefix it, and any
/// other selector (e.g. `workspace:^1.2.0`) is returned without the protocol.
/// A sibling that cannot be found resolves to `*`.
pub fn resolve_workspace_dependency(spec: &str, dep_name: &str, working_dir: &Path) -> String {
    let selector = spec.strip_prefix(WORKSPACE_PREFIX).unwrap_or(spec);
    let prefix = match selector {
        "*" => "",
        "^" | "~" => selector,
        other => return other.to_string(),
    };

    match installed_version(dep_name, working_dir) {
        Some(version) => format!("{}{}", prefix, version),
        None => {
            tracing::warn!(
                "Could not resolve workspace package location for {}",
                dep_name
            );
            "*".to_string()
        }
    }
}

/// Version of `dep_name` as node module resolution would find it from
/// `working_dir`: the nearest `node_modules/<dep>/package.json` upwards.
pub fn installed_version(dep_name: &str, working_dir: &Path) -> Option<String> {
    working_dir
        .ancestors()
        .map(|dir| node_modules_package_dir(dir, dep_name))
        .find(|candidate| candidate.join(MANIFEST_FILE).is_file())
        .and_then(|dir| PackageManifest::load(&dir).ok())
        .map(|manifest| manifest.version().to_string())
}
