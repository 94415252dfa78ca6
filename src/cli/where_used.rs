use super::info::print_not_found;
use super::Context;
use yalc::core::YalcResult;
use yalc::store::listing::list_store_packages;

/// List the projects that use a stored package.
pub fn run(ctx: &Context, name: &str) -> YalcResult<()> {
    let packages = list_store_packages(&ctx.store)?;
    let Some(pkg) = packages.iter().find(|pkg| pkg.name == name) else {
        print_not_found(name, &packages);
        return Ok(());
    };

    println!("{}@{}", pkg.name, pkg.version);
    if pkg.is_unused() {
        println!("Not used in any projects");
        println!("It can be removed with `yalc clean`");
        return Ok(());
    }

    println!("Used in {} project(s):", pkg.used_in_projects.len());
    for project in &pkg.used_in_projects {
        println!("  {}", project.display());
    }
    println!();
    println!("Run `yalc remove {}` in those projects to stop using it", pkg.name);
    Ok(())
}
