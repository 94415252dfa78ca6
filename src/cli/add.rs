use super::{flag_pair, parse_packages, Context};
use clap::Args;
use yalc::core::YalcResult;
use yalc::package::{AddOptions, LinkMode, PackageInstaller};

#[derive(Args, Debug, Clone, Default)]
pub struct AddArgs {
    /// Packages to add, as `name` or `name@version`
    #[arg(required = true)]
    pub packages: Vec<String>,
    /// Add to devDependencies
    #[arg(short = 'D', long, visible_alias = "save-dev")]
    pub dev: bool,
    /// Symlink into node_modules and use a `link:` specifier
    #[arg(long, conflicts_with = "workspace")]
    pub link: bool,
    /// Use the `workspace:*` specifier
    #[arg(short = 'W', long)]
    pub workspace: bool,
    /// Only copy into .yalc, leave node_modules and package.json alone
    #[arg(long, overrides_with = "no_pure")]
    pub pure: bool,
    #[arg(long, overrides_with = "pure")]
    pub no_pure: bool,
    /// Copy every file instead of only changed ones
    #[arg(long)]
    pub replace: bool,
    /// Run the package manager's update afterwards
    #[arg(long, visible_alias = "upgrade")]
    pub update: bool,
    /// Skip preyalc/postyalc scripts
    #[arg(long)]
    pub no_scripts: bool,
}

impl AddArgs {
    pub fn options(&self, ctx: &Context, working_dir: std::path::PathBuf) -> AddOptions {
        let mode = if self.link {
            Some(LinkMode::Symlink {
                rewrite_manifest: true,
            })
        } else if self.workspace {
            Some(LinkMode::Workspace)
        } else {
            None
        };
        AddOptions {
            working_dir,
            mode,
            pure: flag_pair(self.pure, self.no_pure).or(ctx.config.pure),
            dev: self.dev,
            restore: false,
            replace: self.replace,
            update: self.update,
            scripts: ctx.config.scripts && !self.no_scripts,
        }
    }
}

pub async fn run(ctx: &Context, args: AddArgs) -> YalcResult<()> {
    let project_root = ctx.project_root()?;
    let options = args.options(ctx, project_root);
    let installer = PackageInstaller::new(ctx.store.clone());

    let report = installer
        .add_packages(&parse_packages(&args.packages)?, &options)
        .await?;

    if !report.added.is_empty() {
        ctx.success(format!("Added {} package(s)", report.added.len()));
    }
    Ok(())
}
