//! Which files of a package get published.
//!
//! Mirrors npm's packing rules closely enough for local development: a
//! declared `files` list selects paths, otherwise the tree minus
//! `.npmignore` (or `.gitignore`) rules. `.yalcignore` is applied last.

use crate::core::path::{to_slash, IGNORE_FILE, LOCAL_PACKAGES_FOLDER, MANIFEST_FILE};
use crate::core::{YalcError, YalcResult};
use crate::package::manifest::PackageManifest;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SKIPPED_DIRS: [&str; 6] = [".git", "node_modules", ".svn", ".hg", "CVS", LOCAL_PACKAGES_FOLDER];

const SKIPPED_FILES: [&str; 12] = [
    ".npmrc",
    ".npmignore",
    ".gitignore",
    IGNORE_FILE,
    "package-lock.json",
    ".DS_Store",
    "npm-debug.log",
    ".lock-wscript",
    "config.gypi",
    "yalc.lock",
    "yalc.sig",
    ".yarnrc",
];

const SKIPPED_PATTERNS: [&str; 4] = ["*.orig", ".*.swp", "._*", ".wafpickle-*"];

/// Root files published regardless of `files` or ignore rules
const ALWAYS_INCLUDED: [&str; 5] = ["README*", "LICENSE*", "LICENCE*", "CHANGELOG*", "NOTICE*"];

/// Files selected for publishing, relative to the package root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packlist {
    pub files: Vec<PathBuf>,
    /// True when npm packing rules failed and the whole tree was taken.
    pub fallback: bool,
}

/// Select the files to publish from `working_dir`.
///
/// If the packing rules cannot be evaluated the whole tree (minus
/// `node_modules` and `.git`) is used instead. That fallback ignores
/// `files` and `.npmignore`, so it can publish more than npm would.
pub fn package_files(working_dir: &Path, manifest: &PackageManifest) -> YalcResult<Packlist> {
    let (files, fallback) = match npm_files(working_dir, manifest) {
        Ok(files) => (files, false),
        Err(e) => {
            tracing::warn!(
                "Packing rules failed ({}); publishing every file except node_modules and .git. \
                 The \"files\" field and .npmignore are not applied.",
                e
            );
            (all_files(working_dir)?, true)
        }
    };

    let yalcignore = load_ignore_file(working_dir, &working_dir.join(IGNORE_FILE));
    let mut files: Vec<PathBuf> = files
        .into_iter()
        .filter(|rel| match &yalcignore {
            Some(rules) => !rules.matched_path_or_any_parents(rel, false).is_ignore(),
            None => true,
        })
        .collect();
    files.sort();
    files.dedup();

    Ok(Packlist { files, fallback })
}

/// npm packing rules.
pub fn npm_files(working_dir: &Path, manifest: &PackageManifest) -> YalcResult<Vec<PathBuf>> {
    let skipped = build_globset(SKIPPED_PATTERNS.iter().copied())?;
    let always = always_included(manifest)?;
    let candidates = walk(working_dir, &skipped)?;

    let selected: Vec<PathBuf> = match manifest.files() {
        Some(patterns) => {
            let selector = FilesSelector::new(&patterns)?;
            candidates
                .into_iter()
                .filter(|rel| always.is_match(rel) || selector.is_match(rel))
                .collect()
        }
        None => {
            let rules = ignore_rules(working_dir)?;
            candidates
                .into_iter()
                .filter(|rel| {
                    always.is_match(rel)
                        || !rules
                            .as_ref()
                            .is_some_and(|r| r.matched_path_or_any_parents(rel, false).is_ignore())
                })
                .collect()
        }
    };
    Ok(selected)
}

/// Every file except `node_modules` and `.git`.
pub fn all_files(working_dir: &Path) -> YalcResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(working_dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.file_name() != "node_modules" && e.file_name() != ".git");
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            if let Ok(rel) = entry.path().strip_prefix(working_dir) {
                files.push(rel.to_path_buf());
            }
        }
    }
    Ok(files)
}

fn walk(working_dir: &Path, skipped: &GlobSet) -> YalcResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(working_dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !(e.file_type().is_dir() && SKIPPED_DIRS.iter().any(|dir| name == *dir))
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if SKIPPED_FILES.iter().any(|file| name == *file) || skipped.is_match(&*name) {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(working_dir) {
            files.push(rel.to_path_buf());
        }
    }
    Ok(files)
}

/// package.json, readme-like root files, `main` and `bin` targets.
fn always_included(manifest: &PackageManifest) -> YalcResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    builder.add(Glob::new(MANIFEST_FILE).map_err(packlist_error)?);
    for pattern in ALWAYS_INCLUDED {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(packlist_error)?;
        builder.add(glob);
    }

    let targets = manifest
        .main()
        .map(str::to_string)
        .into_iter()
        .chain(manifest.bin().into_iter().map(|(_, path)| path));
    for target in targets {
        let target = clean_pattern(&target);
        if !target.is_empty() {
            builder.add(Glob::new(&escape(&target)).map_err(packlist_error)?);
        }
    }
    builder.build().map_err(packlist_error)
}

/// Matcher for the `files` field. Entries select a path and everything
/// below it; `!` entries exclude. Slash-free entries match at any depth.
struct FilesSelector {
    include: GlobSet,
    exclude: GlobSet,
}

impl FilesSelector {
    fn new(patterns: &[String]) -> YalcResult<Self> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();

        for raw in patterns {
            let (negated, raw) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw.as_str()),
            };
            let pattern = clean_pattern(raw);
            if pattern.is_empty() {
                continue;
            }
            let target = if negated { &mut exclude } else { &mut include };
            for variant in pattern_variants(&pattern) {
                let glob = GlobBuilder::new(&variant)
                    .literal_separator(true)
                    .build()
                    .map_err(packlist_error)?;
                target.add(glob);
            }
        }

        Ok(Self {
            include: include.build().map_err(packlist_error)?,
            exclude: exclude.build().map_err(packlist_error)?,
        })
    }

    fn is_match(&self, rel: &Path) -> bool {
        let rel = to_slash(rel);
        self.include.is_match(&rel) && !self.exclude.is_match(&rel)
    }
}

fn pattern_variants(pattern: &str) -> Vec<String> {
    let mut variants = vec![pattern.to_string(), format!("{}/**", pattern)];
    if !pattern.contains('/') && !pattern.starts_with("**") {
        variants.push(format!("**/{}", pattern));
        variants.push(format!("**/{}/**", pattern));
    }
    variants
}

fn clean_pattern(pattern: &str) -> String {
    let pattern = pattern.trim();
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    let pattern = pattern.strip_prefix('/').unwrap_or(pattern);
    pattern.trim_end_matches('/').to_string()
}

fn escape(path: &str) -> String {
    globset::escape(path)
}

/// `.npmignore`, or `.gitignore` when there is no `.npmignore`.
fn ignore_rules(working_dir: &Path) -> YalcResult<Option<Gitignore>> {
    let npmignore = working_dir.join(".npmignore");
    let source = if npmignore.is_file() {
        npmignore
    } else {
        working_dir.join(".gitignore")
    };
    if !source.is_file() {
        return Ok(None);
    }

    let mut builder = GitignoreBuilder::new(working_dir);
    if let Some(e) = builder.add(&source) {
        return Err(packlist_error(e));
    }
    builder.build().map(Some).map_err(packlist_error)
}

/// Gitignore-syntax rules from `path`. Bad lines are reported and skipped.
fn load_ignore_file(root: &Path, path: &Path) -> Option<Gitignore> {
    if !path.is_file() {
        return None;
    }
    let mut builder = GitignoreBuilder::new(root);
    if let Some(e) = builder.add(path) {
        tracing::warn!("Problem reading {}: {}", path.display(), e);
    }
    match builder.build() {
        Ok(rules) => Some(rules),
        Err(e) => {
            tracing::warn!("Ignoring {}: {}", path.display(), e);
            None
        }
    }
}

fn packlist_error(e: impl std::fmt::Display) -> YalcError {
    YalcError::Packlist(e.to_string())
}

fn build_globset<'a>(patterns: impl Iterator<Item = &'a str>) -> YalcResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(packlist_error)?);
    }
    builder.build().map_err(packlist_error)
}
