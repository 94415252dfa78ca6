use super::{absolute, flag_pair, Context};
use clap::Args;
use std::path::PathBuf;
use yalc::core::YalcResult;
use yalc::resolver::DependencyResolver;
use yalc::store::{PublishOptions, PublishOutcome, Publisher};

#[derive(Args, Debug, Clone, Default)]
pub struct PublishArgs {
    /// Package directory, relative to the current one
    pub dir: Option<PathBuf>,
    /// Publish even if the package is marked private
    #[arg(long)]
    pub private: bool,
    /// Skip when the content has not changed since the last publish
    #[arg(long)]
    pub changed: bool,
    /// Print the list of published files
    #[arg(long)]
    pub content: bool,
    /// Copy every file when pushing instead of only changed ones
    #[arg(long)]
    pub replace: bool,
    /// Run the package manager's update in pushed projects
    #[arg(long, visible_alias = "upgrade")]
    pub update: bool,
    /// Append the content signature to the stored version
    #[arg(long, overrides_with = "no_sig")]
    pub sig: bool,
    #[arg(long, overrides_with = "sig")]
    pub no_sig: bool,
    /// Run lifecycle scripts
    #[arg(long, overrides_with = "no_scripts")]
    pub scripts: bool,
    #[arg(long, overrides_with = "scripts")]
    pub no_scripts: bool,
    /// Keep workspace: and catalog: specifiers as they are
    #[arg(long)]
    pub no_workspace_resolve: bool,
    /// Keep devDependencies in the stored manifest
    #[arg(long)]
    pub no_dev_mod: bool,
}

impl PublishArgs {
    /// `push` runs no scripts unless asked to.
    pub fn options(&self, ctx: &Context, push: bool) -> PublishOptions {
        let working_dir = match &self.dir {
            Some(dir) => absolute(&ctx.cwd, dir),
            None => ctx.cwd.clone(),
        };
        let mut options = PublishOptions::from_config(working_dir, &ctx.config);
        options.private = self.private;
        options.changed = self.changed;
        options.content = self.content;
        options.push = push;
        options.replace = self.replace;
        options.update = self.update;
        if let Some(sig) = flag_pair(self.sig, self.no_sig) {
            options.sig = sig;
        }
        let default_scripts = if push { false } else { ctx.config.scripts };
        options.scripts = flag_pair(self.scripts, self.no_scripts).unwrap_or(default_scripts);
        if self.no_workspace_resolve {
            options.workspace_resolve = false;
        }
        if self.no_dev_mod {
            options.dev_mod = false;
        }
        options
    }
}

pub async fn run(ctx: &Context, args: PublishArgs) -> YalcResult<()> {
    publish(ctx, args.options(ctx, false)).await
}

pub(super) async fn publish(ctx: &Context, options: PublishOptions) -> YalcResult<()> {
    let publisher = Publisher::with_resolver(ctx.store.clone(), DependencyResolver::new());

    match publisher.publish(&options).await? {
        PublishOutcome::Published {
            name,
            version,
            pushed,
            ..
        } => {
            ctx.success(format!("Published {}@{}", name, version));
            if options.push {
                ctx.success(format!("Pushed to {} project(s)", pushed));
            }
        }
        PublishOutcome::Unchanged { name, version } => {
            ctx.success(format!("{}@{} is up to date", name, version));
        }
        PublishOutcome::SkippedPrivate { .. } => {}
    }
    Ok(())
}
