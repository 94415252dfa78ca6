use super::{parse_packages, Context};
use clap::Args;
use yalc::core::YalcResult;
use yalc::package::{update_packages, PackageInstaller, UpdateOptions};

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Packages to update; all locked packages when omitted
    pub packages: Vec<String>,
    /// Re-wire from the .yalc copies instead of the store
    #[arg(long)]
    pub restore: bool,
    /// Copy every file instead of only changed ones
    #[arg(long)]
    pub replace: bool,
    /// Run the package manager's update afterwards
    #[arg(long, visible_alias = "upgrade")]
    pub update: bool,
}

pub async fn run(ctx: &Context, args: UpdateArgs) -> YalcResult<()> {
    let mut options = UpdateOptions::new(ctx.project_root()?);
    options.restore = args.restore;
    options.replace = args.replace;
    options.update = args.update;
    options.scripts = ctx.config.scripts;
    refresh(ctx, &args.packages, &options, "Updated").await
}

pub(super) async fn refresh(
    ctx: &Context,
    packages: &[String],
    options: &UpdateOptions,
    verb: &str,
) -> YalcResult<()> {
    let installer = PackageInstaller::new(ctx.store.clone());
    let report = update_packages(&installer, &parse_packages(packages)?, options).await?;

    if !report.updated.is_empty() {
        ctx.success(format!("{} {} package(s)", verb, report.updated.len()));
    }
    Ok(())
}
