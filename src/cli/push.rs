use super::publish::{publish, PublishArgs};
use super::Context;
use yalc::core::YalcResult;

/// Publish, then refresh every project that has the package added.
pub async fn run(ctx: &Context, args: PublishArgs) -> YalcResult<()> {
    publish(ctx, args.options(ctx, true)).await
}
