use super::{parse_packages, Context};
use clap::Args;
use yalc::core::YalcResult;
use yalc::package::{remove_packages, RemoveOptions};

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    /// Packages to remove, as `name` or `name@version`
    pub packages: Vec<String>,
    /// Remove every package in yalc.lock
    #[arg(long)]
    pub all: bool,
    /// Keep the lockfile entry so `restore` can bring it back
    #[arg(long)]
    pub retreat: bool,
}

pub fn run(ctx: &Context, args: RemoveArgs) -> YalcResult<()> {
    let options = RemoveOptions {
        working_dir: ctx.project_root()?,
        all: args.all,
        retreat: args.retreat,
    };
    unlink(ctx, &args.packages, &options)
}

pub(super) fn unlink(ctx: &Context, packages: &[String], options: &RemoveOptions) -> YalcResult<()> {
    let report = remove_packages(&ctx.store, &parse_packages(packages)?, options)?;

    if !report.removed.is_empty() {
        let verb = if options.retreat { "Retreated" } else { "Removed" };
        ctx.success(format!("{} {} package(s)", verb, report.removed.len()));
    }
    if report.lockfile_deleted {
        ctx.success("No packages left, removed yalc.lock");
    }
    Ok(())
}
