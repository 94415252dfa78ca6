//! `catalog:` protocol support.
//!
//! Catalogs come from the nearest `pnpm-workspace.yaml` and from `catalog` /
//! `catalogs` fields in the package's own manifest, which win on collision.
//! The file grammar is deliberately narrow and read by a line state machine:
//!
//! ```yaml
//! catalog:
//!   react: ^18.2.0
//! catalogs:
//!   legacy:
//!     react: ^16.14.0
//! ```

use crate::core::path::{CATALOG_FILE, MANIFEST_FILE};
use crate::package::manifest::PackageManifest;
use lru::LruCache;
use serde_json::Value;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

pub const CATALOG_PREFIX: &str = "catalog:";

/// Working directories remembered by a [`CatalogCache`].
pub const CATALOG_CACHE_CAPACITY: usize = 50;

pub type CatalogEntries = BTreeMap<String, String>;

/// Default catalog plus named catalogs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogConfig {
    pub default: CatalogEntries,
    pub named: BTreeMap<String, CatalogEntries>,
}

impl CatalogConfig {
    pub fn is_empty(&self) -> bool {
        self.default.is_empty() && self.named.is_empty()
    }

    /// Overlay `catalog` / `catalogs` fields of a package manifest.
    pub fn merge_manifest(&mut self, manifest: &PackageManifest) {
        if let Some(Value::Object(entries)) = manifest.get("catalog") {
            merge_entries(&mut self.default, entries);
        }
        if let Some(Value::Object(catalogs)) = manifest.get("catalogs") {
            for (name, entries) in catalogs {
                if let Value::Object(entries) = entries {
                    merge_entries(self.named.entry(name.clone()).or_default(), entries);
                }
            }
        }
    }
}

fn merge_entries(target: &mut CatalogEntries, entries: &serde_json::Map<String, Value>) {
    for (dep, version) in entries {
        if let Some(version) = version.as_str() {
            target.insert(dep.clone(), version.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseState {
    Root,
    DefaultCatalog,
    NamedCatalogs,
    NamedCatalog(String),
}

/// Parse the `catalog:` and `catalogs:` sections of a workspace file.
///
/// Anything else is ignored and malformed lines are skipped.
pub fn parse_catalog_file(content: &str) -> CatalogConfig {
    let mut config = CatalogConfig::default();
    let mut state = ParseState::Root;
    let mut sections_seen = 0;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.len() - line.trim_start_matches(' ').len();

        if indent == 0 {
            match trimmed.strip_suffix(':').map(str::trim_end) {
                Some("catalog") => {
                    config.default.clear();
                    state = ParseState::DefaultCatalog;
                    sections_seen += 1;
                }
                Some("catalogs") => {
                    state = ParseState::NamedCatalogs;
                    sections_seen += 1;
                }
                _ if sections_seen == 2 => break,
                _ => state = ParseState::Root,
            }
            continue;
        }

        match &state {
            ParseState::DefaultCatalog if indent == 2 => {
                if let Some((dep, version)) = split_entry(trimmed) {
                    if !version.contains("[invalid") {
                        config.default.insert(dep, version);
                    }
                }
            }
            ParseState::NamedCatalogs | ParseState::NamedCatalog(_)
                if indent == 2 && trimmed.ends_with(':') =>
            {
                let name = unquote(trimmed.trim_end_matches(':'));
                if !name.is_empty() {
                    config.named.insert(name.clone(), CatalogEntries::new());
                    state = ParseState::NamedCatalog(name);
                }
            }
            ParseState::NamedCatalog(name) if indent >= 4 => {
                if let Some((dep, version)) = split_entry(trimmed) {
                    if let Some(entries) = config.named.get_mut(name) {
                        entries.insert(dep, version);
                    }
                }
            }
            _ => {}
        }
    }
    config
}

/// Split `key: value` at the first colon that has a value after it.
fn split_entry(line: &str) -> Option<(String, String)> {
    line.char_indices()
        .filter(|&(i, c)| c == ':' && i > 0)
        .find_map(|(i, _)| {
            let value = line[i + 1..].trim();
            (!value.is_empty()).then(|| (unquote(&line[..i]), unquote(value)))
        })
        .filter(|(dep, version)| !dep.is_empty() && !version.is_empty())
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    let s = s.strip_prefix(['"', '\'']).unwrap_or(s);
    let s = s.strip_suffix(['"', '\'']).unwrap_or(s);
    s.trim().to_string()
}

pub fn is_catalog_dependency(spec: &str) -> bool {
    let spec = spec.trim();
    spec.starts_with(CATALOG_PREFIX) || spec == "catalog"
}

/// Resolve a `catalog:` specifier for `dep_name`.
///
/// Never fails: an unknown dependency in the default catalog yields the
/// literal `catalog:`, and an unknown named catalog or dependency yields the
/// specifier unchanged. Each fallback is logged.
pub fn resolve_catalog_dependency(spec: &str, dep_name: &str, config: &CatalogConfig) -> String {
    let spec = spec.trim();
    let dep_name = unquote(dep_name);
    let reference = match spec.strip_prefix(CATALOG_PREFIX) {
        Some(reference) => reference.trim(),
        None => "",
    };

    if reference.is_empty() {
        return match config.default.get(&dep_name) {
            Some(version) => version.clone(),
            None => {
                tracing::warn!(
                    "Package \"{}\" not found in default catalog, using catalog: as fallback",
                    dep_name
                );
                CATALOG_PREFIX.to_string()
            }
        };
    }

    let Some(catalog) = config.named.get(reference).filter(|c| !c.is_empty()) else {
        tracing::warn!(
            "Named catalog \"{}\" not found, using {} as fallback",
            reference,
            spec
        );
        return spec.to_string();
    };

    match catalog.get(&dep_name) {
        Some(version) => version.clone(),
        None => {
            tracing::warn!(
                "Package \"{}\" not found in catalog \"{}\", using {} as fallback",
                dep_name,
                reference,
                spec
            );
            spec.to_string()
        }
    }
}

/// Nearest `pnpm-workspace.yaml` at or above `start`.
pub fn find_catalog_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CATALOG_FILE))
        .find(|candidate| candidate.is_file())
}

/// Modification time of every file a cached config was built from.
type Stamps = Vec<(PathBuf, Option<SystemTime>)>;

#[derive(Debug)]
struct CacheEntry {
    config: CatalogConfig,
    stamps: Stamps,
}

/// Per-working-directory catalog configs, bounded with LRU eviction and
/// invalidated when a source file's modification time changes.
#[derive(Debug)]
pub struct CatalogCache {
    entries: Mutex<LruCache<PathBuf, CacheEntry>>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(CATALOG_CACHE_CAPACITY)
    }
}

impl CatalogCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `working_dir` is cached, without touching its recency.
    pub fn contains(&self, working_dir: &Path) -> bool {
        self.entries
            .lock()
            .map(|c| c.contains(working_dir))
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Catalog config for `working_dir`, reading the sources on a miss.
    pub fn get(&self, working_dir: &Path) -> CatalogConfig {
        let stamps = current_stamps(working_dir);

        if let Ok(mut entries) = self.entries.lock() {
            if let Some(entry) = entries.get(working_dir) {
                if entry.stamps == stamps {
                    return entry.config.clone();
                }
            }
        }

        let config = load_catalog_config(working_dir, &stamps);
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                working_dir.to_path_buf(),
                CacheEntry {
                    config: config.clone(),
                    stamps,
                },
            );
        }
        config
    }
}

fn current_stamps(working_dir: &Path) -> Stamps {
    let mut files = Vec::with_capacity(2);
    if let Some(catalog_file) = find_catalog_file(working_dir) {
        files.push(catalog_file);
    }
    files.push(working_dir.join(MANIFEST_FILE));

    files
        .into_iter()
        .map(|path| {
            let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
            (path, modified)
        })
        .collect()
}

fn load_catalog_config(working_dir: &Path, stamps: &Stamps) -> CatalogConfig {
    let mut config = CatalogConfig::default();

    for (path, _) in stamps {
        if path.file_name().is_some_and(|n| n == CATALOG_FILE) {
            match std::fs::read_to_string(path) {
                Ok(content) => config = parse_catalog_file(&content),
                Err(e) => tracing::warn!(
                    "Could not read {} for catalog configuration: {}",
                    path.display(),
                    e
                ),
            }
        }
    }

    if let Ok(manifest) = PackageManifest::load(working_dir) {
        config.merge_manifest(&manifest);
    }
    config
}
