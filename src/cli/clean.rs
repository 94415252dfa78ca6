use super::Context;
use clap::Args;
use std::fs;
use std::path::Path;
use yalc::core::YalcResult;
use yalc::store::listing::{format_size, list_store_packages, unused_packages};

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    /// Only show what would be removed
    #[arg(long)]
    pub dry_run: bool,
}

/// Delete stored packages no project uses.
pub fn run(ctx: &Context, args: CleanArgs) -> YalcResult<()> {
    let packages = list_store_packages(&ctx.store)?;
    let unused = unused_packages(&packages);

    if unused.is_empty() {
        println!("No unused packages found in store");
        return Ok(());
    }

    let total: u64 = unused.iter().map(|pkg| pkg.size).sum();
    println!("Found {} unused package(s) ({})", unused.len(), format_size(total));
    for pkg in &unused {
        println!("  {}@{} ({})", pkg.name, pkg.version, format_size(pkg.size));
    }

    if args.dry_run {
        println!();
        println!("Dry run, nothing was removed");
        return Ok(());
    }

    let packages_dir = ctx.store.packages_dir();
    let mut removed = 0;
    let mut freed = 0;
    for pkg in &unused {
        // Every stored version goes, not just the listed one
        let package_dir = ctx.store.package_dir(&pkg.name);
        match fs::remove_dir_all(&package_dir) {
            Ok(()) => {
                removed += 1;
                freed += pkg.size;
                prune_empty_parents(&package_dir, &packages_dir);
            }
            Err(e) => {
                tracing::warn!("Failed to remove {}@{}: {}", pkg.name, pkg.version, e);
            }
        }
    }

    ctx.success(format!("Cleaned {} package(s), freed {}", removed, format_size(freed)));
    if removed < unused.len() {
        tracing::warn!("{} package(s) could not be removed", unused.len() - removed);
    }
    Ok(())
}

/// Remove now-empty package and scope directories up to `root`.
fn prune_empty_parents(removed: &Path, root: &Path) {
    let mut dir = removed.parent();
    while let Some(current) = dir {
        if current == root || !current.starts_with(root) {
            break;
        }
        if fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
}
