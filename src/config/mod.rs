use crate::core::path::config_file;
use crate::core::{YalcError, YalcResult};
use crate::package::manifest::PackageManifest;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Project-level rc files, checked in this order.
const PROJECT_RC_FILES: [&str; 3] = [".yalcrc.yaml", ".yalcrc.yml", ".yalcrc.json"];

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Rewrite `workspace:` and `catalog:` specifiers on publish
    #[serde(default = "default_true")]
    pub workspace_resolve: bool,

    /// Append a short signature to published versions
    #[serde(default)]
    pub sig: bool,

    /// Strip devDependencies and prepare/prepublish scripts from published manifests
    #[serde(default = "default_true")]
    pub dev_mod: bool,

    /// Run lifecycle scripts on publish and add
    #[serde(default = "default_true")]
    pub scripts: bool,

    /// Only print errors
    #[serde(default)]
    pub quiet: bool,

    /// Force pure mode on (or off) for add, overriding workspace detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pure: Option<bool>,

    /// Store root (defaults to ~/.yalc, or %LOCALAPPDATA%\Yalc on Windows)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_folder: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_resolve: true,
            sig: false,
            dev_mod: true,
            scripts: true,
            quiet: false,
            pure: None,
            store_folder: None,
        }
    }
}

/// A partial config read from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigLayer {
    #[serde(alias = "workspaceResolve")]
    pub workspace_resolve: Option<bool>,
    pub sig: Option<bool>,
    #[serde(alias = "devMod")]
    pub dev_mod: Option<bool>,
    pub scripts: Option<bool>,
    pub quiet: Option<bool>,
    pub pure: Option<bool>,
    #[serde(alias = "storeFolder")]
    pub store_folder: Option<PathBuf>,
}

impl ConfigLayer {
    /// Read `YALC_*` variables through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).and_then(|value| parse_flag(key, &value));
        Self {
            workspace_resolve: flag("YALC_WORKSPACE_RESOLVE"),
            sig: flag("YALC_SIG"),
            dev_mod: flag("YALC_DEV_MOD"),
            scripts: flag("YALC_SCRIPTS"),
            quiet: flag("YALC_QUIET"),
            pure: flag("YALC_PURE"),
            store_folder: lookup("YALC_STORE_FOLDER")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }
}

fn parse_flag(key: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            tracing::warn!("Ignoring {}={}: expected true or false", key, other);
            None
        }
    }
}

impl Config {
    /// Load config for a project directory
    ///
    /// Precedence, lowest first: defaults, the user config file, project
    /// rc files, the `"yalc"` field of package.json, `YALC_*` variables.
    /// Unreadable sources are skipped with a warning.
    pub fn load(project_dir: &Path) -> YalcResult<Self> {
        let mut config = Self::default();

        if let Ok(user_file) = config_file() {
            if let Some(layer) = read_layer(&user_file) {
                config.apply(layer);
            }
        }

        for name in PROJECT_RC_FILES {
            if let Some(layer) = read_layer(&project_dir.join(name)) {
                config.apply(layer);
            }
        }

        if let Ok(manifest) = PackageManifest::load(project_dir) {
            if let Some(value) = manifest.get("yalc") {
                match serde_json::from_value::<ConfigLayer>(value.clone()) {
                    Ok(layer) => config.apply(layer),
                    Err(e) => tracing::warn!("Ignoring \"yalc\" field in package.json: {}", e),
                }
            }
        }

        config.apply(ConfigLayer::from_env());
        Ok(config)
    }

    /// Overlay every field the layer sets.
    pub fn apply(&mut self, layer: ConfigLayer) {
        if let Some(v) = layer.workspace_resolve {
            self.workspace_resolve = v;
        }
        if let Some(v) = layer.sig {
            self.sig = v;
        }
        if let Some(v) = layer.dev_mod {
            self.dev_mod = v;
        }
        if let Some(v) = layer.scripts {
            self.scripts = v;
        }
        if let Some(v) = layer.quiet {
            self.quiet = v;
        }
        if layer.pure.is_some() {
            self.pure = layer.pure;
        }
        if layer.store_folder.is_some() {
            self.store_folder = layer.store_folder;
        }
    }

    /// Parse a config file by extension (`.json`, otherwise YAML).
    pub fn parse_layer(path: &Path, content: &str) -> YalcResult<ConfigLayer> {
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        if is_json {
            parse_with(content, |c| serde_json::from_str(c).map_err(YalcError::from))
        } else {
            parse_with(content, |c| serde_yaml::from_str(c).map_err(YalcError::from))
        }
    }
}

fn parse_with<T, F>(content: &str, parse: F) -> YalcResult<T>
where
    T: DeserializeOwned + Default,
    F: Fn(&str) -> YalcResult<T>,
{
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    parse(content).map_err(|e| YalcError::Config(format!("Failed to parse config: {}", e)))
}

fn read_layer(path: &Path) -> Option<ConfigLayer> {
    let content = fs::read_to_string(path).ok()?;
    match Config::parse_layer(path, &content) {
        Ok(layer) => Some(layer),
        Err(e) => {
            tracing::warn!("Skipping {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.workspace_resolve);
        assert!(config.dev_mod);
        assert!(config.scripts);
        assert!(!config.sig);
        assert!(!config.quiet);
        assert!(config.pure.is_none());
    }

    #[test]
    fn test_yaml_layer_kebab_case() {
        let layer = Config::parse_layer(
            Path::new(".yalcrc.yaml"),
            "sig: true\nworkspace-resolve: false\nstore-folder: /tmp/store\n",
        )
        .unwrap();
        assert_eq!(layer.sig, Some(true));
        assert_eq!(layer.workspace_resolve, Some(false));
        assert_eq!(layer.store_folder, Some(PathBuf::from("/tmp/store")));
        assert!(layer.dev_mod.is_none());
    }

    #[test]
    fn test_json_layer_camel_case_alias() {
        let layer =
            Config::parse_layer(Path::new(".yalcrc.json"), r#"{"devMod": false, "scripts": false}"#)
                .unwrap();
        assert_eq!(layer.dev_mod, Some(false));
        assert_eq!(layer.scripts, Some(false));
    }

    #[test]
    fn test_malformed_layer_is_config_error() {
        let err = Config::parse_layer(Path::new(".yalcrc.json"), "{nope").unwrap_err();
        assert!(matches!(err, YalcError::Config(_)));
    }

    #[test]
    fn test_apply_overrides_only_set_fields() {
        let mut config = Config::default();
        config.apply(ConfigLayer {
            sig: Some(true),
            ..Default::default()
        });
        assert!(config.sig);
        assert!(config.dev_mod);
    }

    #[test]
    fn test_env_layer_parsing() {
        let layer = ConfigLayer::from_env_with(|key| match key {
            "YALC_SIG" => Some("yes".to_string()),
            "YALC_SCRIPTS" => Some("0".to_string()),
            "YALC_QUIET" => Some("maybe".to_string()),
            "YALC_STORE_FOLDER" => Some("/opt/yalc".to_string()),
            _ => None,
        });
        assert_eq!(layer.sig, Some(true));
        assert_eq!(layer.scripts, Some(false));
        assert_eq!(layer.quiet, None);
        assert_eq!(layer.store_folder, Some(PathBuf::from("/opt/yalc")));
    }

    #[test]
    #[serial]
    fn test_load_project_sources() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".yalcrc.yaml"), "sig: true\nscripts: false\n").unwrap();
        fs::write(
            temp.path().join("package.json"),
            r#"{"name":"app","version":"1.0.0","yalc":{"scripts":true}}"#,
        )
        .unwrap();

        std::env::remove_var("YALC_SIG");
        std::env::remove_var("YALC_SCRIPTS");
        std::env::set_var("YALC_DEV_MOD", "false");
        let config = Config::load(temp.path()).unwrap();
        std::env::remove_var("YALC_DEV_MOD");

        assert!(config.sig);
        assert!(config.scripts);
        assert!(!config.dev_mod);
    }

    #[test]
    #[serial]
    fn test_load_skips_broken_rc() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".yalcrc.json"), "{broken").unwrap();
        std::env::remove_var("YALC_SIG");
        let config = Config::load(temp.path()).unwrap();
        assert!(!config.sig);
    }
}
