use super::update::refresh;
use super::Context;
use clap::Args;
use yalc::core::YalcResult;
use yalc::package::UpdateOptions;

#[derive(Args, Debug, Clone)]
pub struct RestoreArgs {
    /// Packages to restore; all locked packages when omitted
    pub packages: Vec<String>,
    /// Run the package manager's update afterwards
    #[arg(long, visible_alias = "upgrade")]
    pub update: bool,
}

/// Re-wire retreated packages from their .yalc copies.
pub async fn run(ctx: &Context, args: RestoreArgs) -> YalcResult<()> {
    let mut options = UpdateOptions::new(ctx.project_root()?);
    options.restore = true;
    options.update = args.update;
    options.scripts = ctx.config.scripts;
    refresh(ctx, &args.packages, &options, "Restored").await
}
