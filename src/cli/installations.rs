use super::Context;
use clap::Subcommand;
use yalc::core::YalcResult;
use yalc::store::installations::clean_installations;
use yalc::store::InstallationsRegistry;

#[derive(Subcommand, Debug, Clone)]
pub enum InstallationsCommand {
    /// Show projects using stored packages
    Show {
        /// Limit to these packages
        packages: Vec<String>,
    },
    /// Drop installations whose project no longer has the package
    Clean {
        /// Limit to these packages
        packages: Vec<String>,
        /// Only show what would be removed
        #[arg(long)]
        dry: bool,
    },
}

pub fn run(ctx: &Context, command: InstallationsCommand) -> YalcResult<()> {
    match command {
        InstallationsCommand::Show { packages } => show(ctx, &packages),
        InstallationsCommand::Clean { packages, dry } => clean(ctx, &packages, dry),
    }
}

fn show(ctx: &Context, packages: &[String]) -> YalcResult<()> {
    let registry = InstallationsRegistry::load(&ctx.store)?;
    for (name, projects) in registry.entries() {
        if !packages.is_empty() && !packages.contains(name) {
            continue;
        }
        println!("Installations of package {}:", name);
        for project in projects {
            println!("  {}", project.display());
        }
    }
    Ok(())
}

fn clean(ctx: &Context, packages: &[String], dry: bool) -> YalcResult<()> {
    let stale = clean_installations(&ctx.store, packages, dry)?;
    if stale.is_empty() {
        ctx.success("No stale installations found");
        return Ok(());
    }

    for installation in &stale {
        let verb = if dry { "Would remove" } else { "Removed" };
        println!(
            "{} installation of {} in {}",
            verb,
            installation.name,
            installation.path.display()
        );
    }
    if !dry {
        ctx.success(format!("Cleaned {} installation(s)", stale.len()));
    }
    Ok(())
}
