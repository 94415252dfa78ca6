use crate::core::error::{YalcError, YalcResult};
use crate::core::path::MANIFEST_FILE;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const DEFAULT_INDENT: &str = "  ";

/// Which dependency table of package.json an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Regular,
    Dev,
    Peer,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 3] = [
        DependencyKind::Regular,
        DependencyKind::Dev,
        DependencyKind::Peer,
    ];

    pub fn field_name(self) -> &'static str {
        match self {
            DependencyKind::Regular => "dependencies",
            DependencyKind::Dev => "devDependencies",
            DependencyKind::Peer => "peerDependencies",
        }
    }
}

/// A package.json document.
///
/// Unknown fields and key order are kept as read. The original indentation
/// and trailing newline are remembered so an untouched manifest is written
/// back byte for byte.
#[derive(Debug, Clone)]
pub struct PackageManifest {
    fields: Map<String, Value>,
    name: String,
    version: String,
    indent: String,
    trailing_newline: bool,
}

impl PackageManifest {
    /// Load `<dir>/package.json`, failing if name or version are unusable.
    pub fn load(dir: &Path) -> YalcResult<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content, &path)
    }

    /// Load `<dir>/package.json`, logging and returning `None` when it is
    /// missing or invalid.
    pub fn load_valid(dir: &Path) -> Option<Self> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            tracing::warn!("No package.json found in {}", dir.display());
            return None;
        }
        match Self::load(dir) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::warn!("Ignoring {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn parse(content: &str, path: &Path) -> YalcResult<Self> {
        let value: Value = serde_json::from_str(content)?;
        let Value::Object(fields) = value else {
            return Err(invalid(path, "top level is not an object"));
        };

        let name = non_empty_string(&fields, "name").ok_or_else(|| invalid(path, "missing name"))?;
        let version =
            non_empty_string(&fields, "version").ok_or_else(|| invalid(path, "missing version"))?;

        Ok(Self {
            fields,
            name,
            version,
            indent: detect_indent(content),
            trailing_newline: content.ends_with('\n'),
        })
    }

    /// Build a minimal manifest in memory.
    pub fn new(name: &str, version: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(name.to_string()));
        fields.insert("version".to_string(), Value::String(version.to_string()));
        Self {
            fields,
            name: name.to_string(),
            version: version.to_string(),
            indent: DEFAULT_INDENT.to_string(),
            trailing_newline: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: &str) {
        self.version = version.to_string();
        self.fields
            .insert("version".to_string(), Value::String(version.to_string()));
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set_field(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn remove_field(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn is_private(&self) -> bool {
        matches!(self.fields.get("private"), Some(Value::Bool(true)))
    }

    /// True when the manifest declares npm/yarn workspaces.
    pub fn has_workspaces(&self) -> bool {
        match self.fields.get("workspaces") {
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(obj)) => obj.contains_key("packages"),
            _ => false,
        }
    }

    pub fn main(&self) -> Option<&str> {
        self.fields.get("main").and_then(Value::as_str)
    }

    /// The `files` allow-list, if declared.
    pub fn files(&self) -> Option<Vec<String>> {
        let items = self.fields.get("files")?.as_array()?;
        Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn script(&self, name: &str) -> Option<&str> {
        self.fields.get("scripts")?.get(name)?.as_str()
    }

    pub fn remove_script(&mut self, name: &str) -> Option<Value> {
        self.fields
            .get_mut("scripts")?
            .as_object_mut()?
            .shift_remove(name)
    }

    /// Executables as (command name, relative path) pairs.
    ///
    /// A string `bin` is exposed under the unscoped package name.
    pub fn bin(&self) -> Vec<(String, String)> {
        match self.fields.get("bin") {
            Some(Value::String(path)) => {
                let command = self.name.rsplit('/').next().unwrap_or(&self.name);
                vec![(command.to_string(), path.clone())]
            }
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|p| (k.clone(), p.to_string())))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn dependencies(&self, kind: DependencyKind) -> Vec<(String, String)> {
        match self.fields.get(kind.field_name()) {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn dependency(&self, kind: DependencyKind, name: &str) -> Option<&str> {
        self.fields.get(kind.field_name())?.get(name)?.as_str()
    }

    /// Insert or replace a dependency. The table is re-sorted by name, as
    /// package managers write it.
    pub fn set_dependency(&mut self, kind: DependencyKind, name: &str, spec: &str) {
        let entry = self
            .fields
            .entry(kind.field_name().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(name.to_string(), Value::String(spec.to_string()));
            map.sort_keys();
        }
    }

    /// Remove a dependency, dropping the table if it ends up empty.
    pub fn remove_dependency(&mut self, kind: DependencyKind, name: &str) -> Option<String> {
        let field = kind.field_name();
        let map = self.fields.get_mut(field)?.as_object_mut()?;
        let removed = map.shift_remove(name)?;
        if map.is_empty() {
            self.fields.shift_remove(field);
        }
        removed.as_str().map(str::to_string)
    }

    /// Rewrite a dependency table in place, keeping its order.
    pub fn map_dependencies<F>(&mut self, kind: DependencyKind, mut f: F)
    where
        F: FnMut(&str, &str) -> Option<String>,
    {
        let Some(Value::Object(map)) = self.fields.get_mut(kind.field_name()) else {
            return;
        };
        for (name, value) in map.iter_mut() {
            if let Some(spec) = value.as_str() {
                if let Some(replacement) = f(name, spec) {
                    *value = Value::String(replacement);
                }
            }
        }
    }

    /// Serialize with the original indentation.
    pub fn to_json_string(&self) -> YalcResult<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(self.indent.as_bytes());
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.fields.serialize(&mut ser)?;
        let mut out = String::from_utf8(buf)
            .map_err(|e| YalcError::Package(format!("Manifest is not UTF-8: {}", e)))?;
        if self.trailing_newline {
            out.push('\n');
        }
        Ok(out)
    }

    /// Write `<dir>/package.json`
    pub fn save(&self, dir: &Path) -> YalcResult<()> {
        std::fs::write(dir.join(MANIFEST_FILE), self.to_json_string()?)?;
        Ok(())
    }
}

fn invalid(path: &Path, reason: &str) -> YalcError {
    YalcError::InvalidManifest {
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
}

fn non_empty_string(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Leading whitespace of the first indented line, or two spaces.
fn detect_indent(content: &str) -> String {
    content
        .lines()
        .skip(1)
        .find_map(|line| {
            let trimmed = line.trim_start_matches([' ', '\t']);
            let indent = &line[..line.len() - trimmed.len()];
            (!indent.is_empty() && !trimmed.is_empty()).then(|| indent.to_string())
        })
        .unwrap_or_else(|| DEFAULT_INDENT.to_string())
}
