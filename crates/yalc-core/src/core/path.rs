use crate::core::error::{YalcError, YalcResult};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Project manifest file name
pub const MANIFEST_FILE: &str = "package.json";
/// Per-project lockfile
pub const LOCKFILE_NAME: &str = "yalc.lock";
/// Per-project folder holding synced package copies
pub const LOCAL_PACKAGES_FOLDER: &str = ".yalc";
/// Standalone signature file written next to every stored version
pub const SIGNATURE_FILE: &str = "yalc.sig";
/// Publish-time ignore file (gitignore syntax)
pub const IGNORE_FILE: &str = ".yalcignore";
/// Global registry of consuming projects, kept in the store root
pub const INSTALLATIONS_FILE: &str = "installations.json";
/// Monorepo catalog declarations
pub const CATALOG_FILE: &str = "pnpm-workspace.yaml";

const PACKAGES_FOLDER: &str = "packages";

static STORE_DIR_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

/// Override the store root for the rest of the process.
///
/// Only the first call wins; returns `false` if an override was already set.
pub fn set_store_dir_override(path: PathBuf) -> bool {
    STORE_DIR_OVERRIDE.set(path).is_ok()
}

/// Get the default store root
///
/// Platform-specific locations:
/// - Windows: %LOCALAPPDATA%\Yalc
/// - Linux/macOS: ~/.yalc
pub fn default_store_dir() -> YalcResult<PathBuf> {
    if cfg!(windows) {
        let local = dirs::data_local_dir().ok_or_else(|| {
            YalcError::Path("Could not determine local app data directory".to_string())
        })?;
        Ok(local.join("Yalc"))
    } else {
        let home = dirs::home_dir()
            .ok_or_else(|| YalcError::Path("Could not determine home directory".to_string()))?;
        Ok(home.join(".yalc"))
    }
}

/// Get the store root, honoring a one-shot override
pub fn store_dir() -> YalcResult<PathBuf> {
    match STORE_DIR_OVERRIDE.get() {
        Some(path) => Ok(path.clone()),
        None => default_store_dir(),
    }
}

/// Directory holding every published package under a store root
pub fn store_packages_dir(store_root: &Path) -> PathBuf {
    store_root.join(PACKAGES_FOLDER)
}

/// Get the user config file path
///
/// Platform-specific locations:
/// - Windows: %APPDATA%\yalc\config.yaml
/// - Linux: ~/.config/yalc/config.yaml
/// - macOS: ~/Library/Application Support/yalc/config.yaml
pub fn config_file() -> YalcResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| YalcError::Path("Could not determine config directory".to_string()))?;
    Ok(config_dir.join("yalc").join("config.yaml"))
}

/// Get the lockfile path for a project (./yalc.lock)
pub fn lockfile_path(project_root: &Path) -> PathBuf {
    project_root.join(LOCKFILE_NAME)
}

/// Get the local packages folder for a project (./.yalc)
pub fn local_packages_dir(project_root: &Path) -> PathBuf {
    project_root.join(LOCAL_PACKAGES_FOLDER)
}

/// Get the local copy of one package (./.yalc/<name>)
pub fn local_package_dir(project_root: &Path, name: &str) -> PathBuf {
    local_packages_dir(project_root).join(name)
}

/// Get the node_modules directory for a project
pub fn node_modules_dir(project_root: &Path) -> PathBuf {
    project_root.join("node_modules")
}

/// Get the installed location of a package (./node_modules/<name>)
pub fn node_modules_package_dir(project_root: &Path, name: &str) -> PathBuf {
    node_modules_dir(project_root).join(name)
}

/// Get the executable bin directory (./node_modules/.bin)
pub fn bin_dir(project_root: &Path) -> PathBuf {
    node_modules_dir(project_root).join(".bin")
}

/// Find the project root by looking for package.json
pub fn find_project_root(start: &Path) -> YalcResult<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(MANIFEST_FILE).exists() {
            return Ok(current);
        }

        if let Some(parent) = current.parent() {
            current = parent.to_path_buf();
        } else {
            return Err(YalcError::Path(
                "Could not find package.json in current directory or parents".to_string(),
            ));
        }
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> YalcResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Normalize a path for cross-platform compatibility
pub fn normalize_path(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Render a relative path with forward slashes regardless of platform.
pub fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        if let Component::Normal(part) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&part.to_string_lossy());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_paths() {
        let root = Path::new("/work/app");
        assert_eq!(lockfile_path(root), root.join("yalc.lock"));
        assert_eq!(local_package_dir(root, "@scope/pkg"), root.join(".yalc/@scope/pkg"));
        assert_eq!(node_modules_package_dir(root, "pkg"), root.join("node_modules/pkg"));
        assert_eq!(bin_dir(root), root.join("node_modules/.bin"));
    }

    #[test]
    fn test_store_packages_dir() {
        let store = Path::new("/tmp/store");
        assert_eq!(store_packages_dir(store), store.join("packages"));
    }

    #[test]
    fn test_find_project_root_walks_up() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("package.json"), "{}").unwrap();
        let nested = temp.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let root = find_project_root(&nested).unwrap();
        assert_eq!(root, temp.path());
    }

    #[test]
    fn test_find_project_root_missing() {
        let temp = TempDir::new().unwrap();
        // Nothing above a temp dir is expected to hold a package.json
        let result = find_project_root(temp.path());
        if let Ok(found) = result {
            assert!(!found.starts_with(temp.path()));
        }
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a").join("b");
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
        ensure_dir(&dir).unwrap();
    }

    #[test]
    fn test_to_slash() {
        let rel: PathBuf = ["lib", "nested", "index.js"].iter().collect();
        assert_eq!(to_slash(&rel), "lib/nested/index.js");
        assert_eq!(to_slash(Path::new("./a/b")), "a/b");
    }
}
