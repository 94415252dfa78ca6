use super::remove::unlink;
use super::Context;
use clap::Args;
use yalc::core::YalcResult;
use yalc::package::RemoveOptions;

#[derive(Args, Debug, Clone)]
pub struct RetreatArgs {
    /// Packages to retreat, as `name` or `name@version`
    pub packages: Vec<String>,
    /// Retreat every package in yalc.lock
    #[arg(long)]
    pub all: bool,
}

/// Unlink packages but keep them in yalc.lock for `restore`.
pub fn run(ctx: &Context, args: RetreatArgs) -> YalcResult<()> {
    let options = RemoveOptions {
        working_dir: ctx.project_root()?,
        all: args.all,
        retreat: true,
    };
    unlink(ctx, &args.packages, &options)
}
