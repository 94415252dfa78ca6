use super::Context;
use clap::Args;
use std::path::Path;
use std::process::Command;
use yalc::core::path::{LOCAL_PACKAGES_FOLDER, MANIFEST_FILE};
use yalc::core::{YalcError, YalcResult};
use yalc::package::{DependencyKind, PackageManifest};

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Only check when package.json is staged for commit
    #[arg(long)]
    pub commit: bool,
}

/// Fail if package.json still points at `.yalc` copies.
pub fn run(ctx: &Context, args: CheckArgs) -> YalcResult<()> {
    let project_root = ctx.project_root()?;

    if args.commit && !manifest_is_staged(&project_root)? {
        return Ok(());
    }

    let manifest = PackageManifest::load(&project_root)?;
    let local = local_dependencies(&manifest);
    if !local.is_empty() {
        return Err(YalcError::LocalDependencies(local));
    }
    ctx.success("No yalc dependencies found");
    Ok(())
}

/// Names of regular and dev dependencies with a `file:`/`link:` `.yalc` address.
pub fn local_dependencies(manifest: &PackageManifest) -> Vec<String> {
    [DependencyKind::Regular, DependencyKind::Dev]
        .into_iter()
        .flat_map(|kind| manifest.dependencies(kind))
        .filter(|(_, spec)| is_local_package_spec(spec))
        .map(|(name, _)| name)
        .collect()
}

fn is_local_package_spec(spec: &str) -> bool {
    let Some(path) = spec
        .strip_prefix("file:")
        .or_else(|| spec.strip_prefix("link:"))
    else {
        return false;
    };
    let path = path.strip_prefix("./").unwrap_or(path);
    path.strip_prefix(LOCAL_PACKAGES_FOLDER)
        .is_some_and(|rest| rest.starts_with('/'))
}

fn manifest_is_staged(project_root: &Path) -> YalcResult<bool> {
    let output = Command::new("git")
        .args(["diff", "--cached", "--name-only"])
        .current_dir(project_root)
        .output()?;
    if !output.status.success() {
        return Err(YalcError::SubprocessExit(output.status.code().unwrap_or(1)));
    }
    let staged = String::from_utf8_lossy(&output.stdout);
    Ok(staged
        .lines()
        .any(|line| Path::new(line.trim()).file_name().is_some_and(|name| name == MANIFEST_FILE)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_package_spec() {
        assert!(is_local_package_spec("file:.yalc/dep"));
        assert!(is_local_package_spec("link:./.yalc/@scope/dep"));
        assert!(!is_local_package_spec("file:../dep"));
        assert!(!is_local_package_spec("file:.yalcdep"));
        assert!(!is_local_package_spec("workspace:*"));
        assert!(!is_local_package_spec("^1.0.0"));
    }

    #[test]
    fn test_local_dependencies_checks_both_tables() {
        let mut manifest = PackageManifest::new("app", "1.0.0");
        manifest.set_dependency(DependencyKind::Regular, "a", "file:.yalc/a");
        manifest.set_dependency(DependencyKind::Regular, "b", "^2.0.0");
        manifest.set_dependency(DependencyKind::Dev, "c", "link:.yalc/c");
        assert_eq!(local_dependencies(&manifest), vec!["a".to_string(), "c".to_string()]);
    }
}
