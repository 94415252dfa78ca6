//! Per-project `yalc.lock`.

use crate::core::path::{lockfile_path, LOCAL_PACKAGES_FOLDER};
use crate::core::{YalcError, YalcResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

const LOCKFILE_VERSION: &str = "v1";

/// How a stored package is wired into a consuming project.
///
/// Chosen once per add and recorded in the lockfile so update can replay it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Copied into node_modules, manifest points at `file:.yalc/<name>`
    File,
    /// node_modules entry is a symlink into `.yalc`. With
    /// `rewrite_manifest` the manifest points at `link:.yalc/<name>`,
    /// otherwise it is left alone.
    Symlink { rewrite_manifest: bool },
    /// Copied into node_modules, manifest points at `workspace:*`
    Workspace,
    /// Only the `.yalc` copy; node_modules and the manifest are untouched
    Pure,
}

impl LinkMode {
    /// Manifest specifier this mode writes, if it writes one.
    pub fn manifest_address(self, name: &str) -> Option<String> {
        match self {
            LinkMode::File => Some(format!("file:{}/{}", LOCAL_PACKAGES_FOLDER, name)),
            LinkMode::Symlink {
                rewrite_manifest: true,
            } => Some(format!("link:{}/{}", LOCAL_PACKAGES_FOLDER, name)),
            LinkMode::Workspace => Some("workspace:*".to_string()),
            LinkMode::Symlink {
                rewrite_manifest: false,
            }
            | LinkMode::Pure => None,
        }
    }

    pub fn is_symlink(self) -> bool {
        matches!(self, LinkMode::Symlink { .. })
    }

    /// Whether anything is placed in node_modules.
    pub fn wires_node_modules(self) -> bool {
        !matches!(self, LinkMode::Pure)
    }
}

/// One linked package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockfileEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub file: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub link: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub pure: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub workspace: bool,

    /// Specifier the manifest had before linking, restored on remove/retreat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl LockfileEntry {
    pub fn new(mode: LinkMode) -> Self {
        let mut entry = Self::default();
        entry.set_mode(mode);
        entry
    }

    pub fn set_mode(&mut self, mode: LinkMode) {
        self.file = mode == LinkMode::File;
        self.link = mode
            == LinkMode::Symlink {
                rewrite_manifest: true,
            };
        self.workspace = mode == LinkMode::Workspace;
        self.pure = mode == LinkMode::Pure;
    }

    /// Recorded mode. An entry with no flag set was added with `link`.
    pub fn mode(&self) -> LinkMode {
        if self.pure {
            LinkMode::Pure
        } else if self.workspace {
            LinkMode::Workspace
        } else if self.link {
            LinkMode::Symlink {
                rewrite_manifest: true,
            }
        } else if self.file {
            LinkMode::File
        } else {
            LinkMode::Symlink {
                rewrite_manifest: false,
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct LockfileDocument<'a> {
    version: &'static str,
    packages: &'a BTreeMap<String, LockfileEntry>,
}

/// The `yalc.lock` contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lockfile {
    pub packages: BTreeMap<String, LockfileEntry>,
}

impl Lockfile {
    pub fn exists(project_root: &Path) -> bool {
        lockfile_path(project_root).exists()
    }

    /// Read a project's lockfile. A missing or unparseable file is an empty
    /// lockfile; the legacy flat `v0` layout is migrated.
    pub fn load(project_root: &Path) -> YalcResult<Self> {
        let path = lockfile_path(project_root);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        match Self::parse(&content) {
            Ok(lockfile) => Ok(lockfile),
            Err(e) => {
                tracing::warn!(
                    "Could not read {}, treating it as empty: {}",
                    path.display(),
                    e
                );
                Ok(Self::default())
            }
        }
    }

    pub fn parse(content: &str) -> YalcResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_str(content)?;
        let Value::Object(mut obj) = value else {
            return Err(YalcError::Lockfile("expected a JSON object".to_string()));
        };

        let is_v1 = obj.get("version").and_then(Value::as_str) == Some(LOCKFILE_VERSION);
        let packages = if is_v1 {
            obj.shift_remove("packages").unwrap_or(Value::Object(Default::default()))
        } else {
            Value::Object(obj)
        };
        Ok(Self {
            packages: serde_json::from_value(packages)?,
        })
    }

    pub fn to_json_string(&self) -> YalcResult<String> {
        Ok(serde_json::to_string_pretty(&LockfileDocument {
            version: LOCKFILE_VERSION,
            packages: &self.packages,
        })?)
    }

    pub fn save(&self, project_root: &Path) -> YalcResult<()> {
        std::fs::write(lockfile_path(project_root), self.to_json_string()?)?;
        Ok(())
    }

    /// Delete the lockfile. Already gone is fine.
    pub fn delete(project_root: &Path) -> YalcResult<()> {
        match std::fs::remove_file(lockfile_path(project_root)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&LockfileEntry> {
        self.packages.get(name)
    }

    /// Insert an entry, keeping the previously remembered `replaced`
    /// specifier when the new entry has none.
    pub fn upsert(&mut self, name: &str, mut entry: LockfileEntry) {
        if entry.replaced.is_none() {
            if let Some(old) = self.packages.get(name) {
                entry.replaced = old.replaced.clone();
            }
        }
        self.packages.insert(name.to_string(), entry);
    }

    pub fn remove(&mut self, name: &str) -> Option<LockfileEntry> {
        self.packages.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
