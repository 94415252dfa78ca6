use super::Context;
use chrono::{Local, Utc};
use yalc::core::YalcResult;
use yalc::package::DependencyKind;
use yalc::store::listing::{format_relative_time, format_size, list_store_packages, StorePackageInfo};

/// Show one stored package: size, publish time, consumers and manifest summary.
pub fn run(ctx: &Context, name: &str) -> YalcResult<()> {
    let packages = list_store_packages(&ctx.store)?;
    let Some(pkg) = packages.iter().find(|pkg| pkg.name == name) else {
        print_not_found(name, &packages);
        return Ok(());
    };

    println!("{}@{}", pkg.name, pkg.version);
    println!();
    println!("Size: {}", format_size(pkg.size));
    println!(
        "Published: {} ({})",
        format_relative_time(pkg.published_at, Utc::now()),
        pkg.published_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!("Store path: {}", pkg.store_path.display());
    println!();

    if pkg.is_unused() {
        println!("Not used in any projects");
        println!("Run `yalc clean` to remove unused packages");
    } else {
        println!("Used in {} project(s):", pkg.used_in_projects.len());
        for project in &pkg.used_in_projects {
            println!("  {}", project.display());
        }
    }

    if let Some(manifest) = &pkg.manifest {
        println!();
        println!("Manifest:");
        if let Some(description) = manifest.get("description").and_then(|v| v.as_str()) {
            println!("  Description: {}", description);
        }
        if let Some(main) = manifest.main() {
            println!("  Main: {}", main);
        }
        let deps = manifest.dependencies(DependencyKind::Regular).len();
        if deps > 0 {
            println!("  Dependencies: {}", deps);
        }
        let dev_deps = manifest.dependencies(DependencyKind::Dev).len();
        if dev_deps > 0 {
            println!("  Dev dependencies: {}", dev_deps);
        }
        let scripts = manifest
            .get("scripts")
            .and_then(|v| v.as_object())
            .map_or(0, |s| s.len());
        if scripts > 0 {
            println!("  Scripts: {}", scripts);
        }
    }
    Ok(())
}

pub(super) fn print_not_found(name: &str, packages: &[StorePackageInfo]) {
    println!("Package '{}' not found in store", name);
    if packages.is_empty() {
        return;
    }
    println!();
    println!("Available packages:");
    for pkg in packages {
        println!("  {}@{}", pkg.name, pkg.version);
    }
}
