use super::Context;
use chrono::Utc;
use clap::Args;
use yalc::core::{YalcError, YalcResult};
use yalc::store::listing::{
    format_relative_time, format_size, list_store_packages, store_stats, StorePackageInfo,
};

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Show size, publish time and consuming projects
    #[arg(long)]
    pub detailed: bool,
    /// Only packages no project uses
    #[arg(long)]
    pub unused: bool,
    /// Print JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(ctx: &Context, args: ListArgs) -> YalcResult<()> {
    let packages = list_store_packages(&ctx.store)?;
    if packages.is_empty() {
        println!("No packages found in store");
        return Ok(());
    }

    let shown: Vec<&StorePackageInfo> = packages
        .iter()
        .filter(|pkg| !args.unused || pkg.is_unused())
        .collect();
    if args.unused && shown.is_empty() {
        println!("No unused packages found");
        return Ok(());
    }

    if args.json {
        let json = serde_json::to_string_pretty(&shown)
            .map_err(|e| YalcError::Store(format!("Failed to serialize package list: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    let stats = store_stats(&packages);
    if args.detailed {
        println!(
            "Yalc store ({} packages, {})",
            stats.total_packages,
            format_size(stats.total_size)
        );
        println!();
        let now = Utc::now();
        for pkg in &shown {
            let usage = if pkg.is_unused() {
                "unused".to_string()
            } else {
                format!("{} project(s)", pkg.used_in_projects.len())
            };
            println!("{}@{}", pkg.name, pkg.version);
            println!(
                "  {} | {} | {}",
                format_size(pkg.size),
                format_relative_time(pkg.published_at, now),
                usage
            );
            for project in &pkg.used_in_projects {
                println!("  -> {}", project.display());
            }
            println!();
        }
        if stats.unused_packages > 0 {
            println!(
                "Run 'yalc clean' to remove {} unused package(s)",
                stats.unused_packages
            );
        }
    } else {
        let qualifier = if args.unused { " unused" } else { "" };
        println!("Yalc store: {}{} package(s)", shown.len(), qualifier);
        println!();
        for pkg in &shown {
            let marker = if pkg.is_unused() { "-" } else { "*" };
            if args.unused {
                println!("  {} {}@{}", marker, pkg.name, pkg.version);
            } else {
                println!(
                    "  {} {}@{} ({})",
                    marker,
                    pkg.name,
                    pkg.version,
                    format_size(pkg.size)
                );
            }
        }
        if !args.unused {
            println!();
            println!(
                "Total: {}, {} unused",
                format_size(stats.total_size),
                stats.unused_packages
            );
        }
    }
    Ok(())
}
