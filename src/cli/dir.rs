use super::Context;
use yalc::core::YalcResult;

/// Print the store root.
pub fn run(ctx: &Context) -> YalcResult<()> {
    println!("{}", ctx.store.root().display());
    Ok(())
}
