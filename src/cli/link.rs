use super::{flag_pair, parse_packages, Context};
use clap::Args;
use yalc::core::YalcResult;
use yalc::package::{AddOptions, LinkMode, PackageInstaller};

#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Packages to link, as `name` or `name@version`
    #[arg(required = true)]
    pub packages: Vec<String>,
    #[arg(long, overrides_with = "no_pure")]
    pub pure: bool,
    #[arg(long, overrides_with = "pure")]
    pub no_pure: bool,
}

/// Symlink packages into node_modules without touching package.json.
pub async fn run(ctx: &Context, args: LinkArgs) -> YalcResult<()> {
    let mut options = AddOptions::new(ctx.project_root()?);
    options.mode = Some(LinkMode::Symlink {
        rewrite_manifest: false,
    });
    options.pure = flag_pair(args.pure, args.no_pure).or(ctx.config.pure);
    options.scripts = ctx.config.scripts;

    let installer = PackageInstaller::new(ctx.store.clone());
    let report = installer
        .add_packages(&parse_packages(&args.packages)?, &options)
        .await?;

    if !report.added.is_empty() {
        ctx.success(format!("Linked {} package(s)", report.added.len()));
    }
    Ok(())
}
