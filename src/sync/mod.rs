//! Directory mirroring with minimal I/O.
//!
//! [`DirSynchronizer::sync`] makes a destination tree an exact copy of a
//! source tree. Unchanged files are detected from size and modification
//! time, optionally confirmed by content digest. Copies carry the source
//! modification time so a repeated sync touches nothing.

use crate::core::{YalcError, YalcResult};
use crate::package::signature::{file_digest_async, FileDigest};
use filetime::FileTime;
use futures_util::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use walkdir::WalkDir;

const SKIPPED_DIR: &str = "node_modules";

/// What a sync run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub copied: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub errors: usize,
}

impl SyncReport {
    /// True when no file was copied or deleted.
    pub fn is_noop(&self) -> bool {
        self.copied == 0 && self.removed == 0
    }

    fn absorb(&mut self, other: &SyncReport) {
        self.copied += other.copied;
        self.removed += other.removed;
        self.unchanged += other.unchanged;
        self.errors += other.errors;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    File,
}

type Tree = BTreeMap<PathBuf, EntryKind>;

#[derive(Debug, Clone)]
struct CachedDigest {
    len: u64,
    modified: Option<SystemTime>,
    digest: String,
}

/// Work derived from comparing two trees.
#[derive(Debug, Default)]
struct SyncPlan {
    remove: Vec<PathBuf>,
    create_dirs: Vec<PathBuf>,
    copy: Vec<PathBuf>,
    compare: Vec<PathBuf>,
}

impl SyncPlan {
    fn build(source: &Tree, dest: &Tree) -> Self {
        let mut plan = SyncPlan::default();
        let mut remove = Vec::new();

        for (rel, kind) in source {
            match dest.get(rel) {
                Some(existing) if existing == kind => {
                    if *kind == EntryKind::File {
                        plan.compare.push(rel.clone());
                    }
                }
                other => {
                    if other.is_some() {
                        remove.push(rel.clone());
                    }
                    match kind {
                        EntryKind::Dir => plan.create_dirs.push(rel.clone()),
                        EntryKind::File => plan.copy.push(rel.clone()),
                    }
                }
            }
        }

        remove.extend(dest.keys().filter(|rel| !source.contains_key(*rel)).cloned());
        remove.sort();

        // Descendants sort right after their ancestor; removing the ancestor covers them.
        for rel in remove {
            let covered = plan
                .remove
                .last()
                .is_some_and(|parent: &PathBuf| rel.starts_with(parent));
            if !covered {
                plan.remove.push(rel);
            }
        }
        plan
    }
}

/// Mirrors directory trees, caching source digests for the session.
#[derive(Debug, Clone, Default)]
pub struct DirSynchronizer {
    digests: Arc<Mutex<HashMap<PathBuf, CachedDigest>>>,
}

impl DirSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `dest` mirror `source`. `node_modules` is ignored on both sides.
    ///
    /// Per-file failures are logged and counted in the report; only a
    /// missing source or an unusable destination root is an error.
    pub async fn sync(
        &self,
        source: &Path,
        dest: &Path,
        compare_content: bool,
    ) -> YalcResult<SyncReport> {
        if !source.is_dir() {
            return Err(YalcError::Path(format!(
                "Sync source {} is not a directory",
                source.display()
            )));
        }
        tokio::fs::create_dir_all(dest).await?;

        let (source_tree, dest_tree, scan_errors) = {
            let source = source.to_path_buf();
            let dest = dest.to_path_buf();
            tokio::task::spawn_blocking(move || {
                let (src, src_errors) = scan_tree(&source, true);
                let (dst, dst_errors) = scan_tree(&dest, false);
                (src, dst, src_errors + dst_errors)
            })
            .await
            .map_err(|e| YalcError::Path(format!("Directory scan failed: {}", e)))?
        };

        let plan = SyncPlan::build(&source_tree, &dest_tree);
        let mut report = SyncReport {
            errors: scan_errors,
            ..SyncReport::default()
        };

        let removals = join_all(plan.remove.iter().map(|rel| remove_entry(dest.join(rel)))).await;
        for (rel, result) in plan.remove.iter().zip(removals) {
            match result {
                Ok(true) => report.removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Could not remove {}: {}", dest.join(rel).display(), e);
                    report.errors += 1;
                }
            }
        }

        for rel in &plan.create_dirs {
            if let Err(e) = tokio::fs::create_dir_all(dest.join(rel)).await {
                tracing::warn!("Could not create {}: {}", dest.join(rel).display(), e);
                report.errors += 1;
            }
        }

        let decisions = join_all(
            plan.compare
                .iter()
                .map(|rel| self.needs_copy(source, dest, rel, compare_content)),
        )
        .await;

        let mut copies = plan.copy;
        for (rel, decision) in plan.compare.into_iter().zip(decisions) {
            match decision {
                Ok(true) => copies.push(rel),
                Ok(false) => report.unchanged += 1,
                Err(e) => {
                    tracing::debug!("Comparison failed for {}: {}", rel.display(), e);
                    copies.push(rel);
                }
            }
        }

        report.absorb(&copy_all(source, dest, &copies).await);

        tracing::debug!(
            "Synced {} -> {}: {} copied, {} removed, {} unchanged",
            source.display(),
            dest.display(),
            report.copied,
            report.removed,
            report.unchanged
        );
        Ok(report)
    }

    async fn needs_copy(
        &self,
        source: &Path,
        dest: &Path,
        rel: &Path,
        compare_content: bool,
    ) -> YalcResult<bool> {
        let src_path = source.join(rel);
        let dst_path = dest.join(rel);
        let src_meta = tokio::fs::metadata(&src_path).await?;
        let dst_meta = tokio::fs::metadata(&dst_path).await?;

        if src_meta.len() == dst_meta.len() {
            if let (Ok(a), Ok(b)) = (src_meta.modified(), dst_meta.modified()) {
                if a == b {
                    return Ok(false);
                }
            }
        }
        if !compare_content {
            return Ok(true);
        }
        // Different sizes can never hash equal.
        if src_meta.len() != dst_meta.len() {
            return Ok(true);
        }

        let src_digest = self.source_digest(&src_path, rel, &src_meta).await?;
        let dst_digest = file_digest_async(dst_path, rel.to_path_buf()).await?;
        Ok(src_digest != dst_digest.digest)
    }

    /// Digest of a source file, reused while its size and mtime hold.
    async fn source_digest(&self, path: &Path, rel: &Path, meta: &Metadata) -> YalcResult<String> {
        let modified = meta.modified().ok();
        if let Some(hit) = self.lookup(path) {
            if hit.len == meta.len() && hit.modified == modified {
                return Ok(hit.digest);
            }
        }

        let FileDigest { digest, .. } =
            file_digest_async(path.to_path_buf(), rel.to_path_buf()).await?;
        if let Ok(mut cache) = self.digests.lock() {
            cache.insert(
                path.to_path_buf(),
                CachedDigest {
                    len: meta.len(),
                    modified,
                    digest: digest.clone(),
                },
            );
        }
        Ok(digest)
    }

    fn lookup(&self, path: &Path) -> Option<CachedDigest> {
        self.digests.lock().ok()?.get(path).cloned()
    }
}

/// Copy the listed relative paths from `source` into `dest`, preserving
/// modification times.
pub async fn copy_all(source: &Path, dest: &Path, files: &[PathBuf]) -> SyncReport {
    let results = join_all(
        files
            .iter()
            .map(|rel| copy_file(source.join(rel), dest.join(rel))),
    )
    .await;

    let mut report = SyncReport::default();
    for (rel, result) in files.iter().zip(results) {
        match result {
            Ok(()) => report.copied += 1,
            Err(e) => {
                tracing::warn!("Could not copy {}: {}", rel.display(), e);
                report.errors += 1;
            }
        }
    }
    report
}

async fn copy_file(src: PathBuf, dst: PathBuf) -> YalcResult<()> {
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match tokio::fs::copy(&src, &dst).await {
        Ok(_) => {}
        // A read-only file from an earlier copy blocks overwriting.
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tokio::fs::remove_file(&dst).await?;
            tokio::fs::copy(&src, &dst).await?;
        }
        Err(e) => return Err(e.into()),
    }

    let meta = tokio::fs::metadata(&src).await?;
    let mtime = FileTime::from_last_modification_time(&meta);
    filetime::set_file_mtime(&dst, mtime)?;
    Ok(())
}

/// Delete a file or directory tree. Already gone counts as success.
async fn remove_entry(path: PathBuf) -> YalcResult<bool> {
    let meta = match tokio::fs::symlink_metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let result = if meta.is_dir() {
        tokio::fs::remove_dir_all(&path).await
    } else {
        tokio::fs::remove_file(&path).await
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Relative paths of everything under `root`, skipping `node_modules`.
fn scan_tree(root: &Path, follow_links: bool) -> (Tree, usize) {
    let mut tree = Tree::new();
    let mut errors = 0;

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(follow_links)
        .into_iter()
        .filter_entry(|e| e.file_name() != SKIPPED_DIR);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                errors += 1;
                continue;
            }
        };
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let kind = if entry.file_type().is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        tree.insert(rel.to_path_buf(), kind);
    }
    (tree, errors)
}
