use crate::core::{YalcError, YalcResult};
use crate::package::manifest::PackageManifest;
use crate::scripts::package_manager::PackageManager;
use std::path::Path;
use std::process::Command;

/// Runs package.json lifecycle scripts through the project's package manager.
pub struct ScriptRunner;

impl ScriptRunner {
    /// Run `script` in `dir` if the manifest declares it.
    ///
    /// Output streams straight to the terminal. Returns `Ok(false)` when the
    /// script is not declared; a non-zero exit becomes
    /// [`YalcError::ScriptFailed`].
    pub fn run_if_present(manifest: &PackageManifest, script: &str, dir: &Path) -> YalcResult<bool> {
        if manifest.script(script).is_none() {
            return Ok(false);
        }

        let pm = PackageManager::detect(dir);
        let (program, args) = pm.run_command();
        tracing::info!("Running {} script in {}: {} {}", script, manifest.name(), pm, script);

        let status = Command::new(program)
            .args(args)
            .arg(script)
            .current_dir(dir)
            .status()?;

        if !status.success() {
            return Err(YalcError::ScriptFailed {
                script: script.to_string(),
                code: status.code().unwrap_or(1),
            });
        }
        Ok(true)
    }

    /// Run each script in order, stopping at the first failure.
    pub fn run_all(manifest: &PackageManifest, scripts: &[&str], dir: &Path) -> YalcResult<()> {
        for script in scripts {
            Self::run_if_present(manifest, script, dir)?;
        }
        Ok(())
    }

    /// Run the package manager's update command for the given packages.
    pub fn update_packages(dir: &Path, packages: &[String]) -> YalcResult<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let pm = PackageManager::detect(dir);
        let (program, args) = pm.update_command();
        tracing::info!("Running {} {} {}", program, args.join(" "), packages.join(" "));

        let status = Command::new(program)
            .args(args)
            .args(packages)
            .current_dir(dir)
            .status()?;

        if !status.success() {
            return Err(YalcError::SubprocessExit(status.code().unwrap_or(1)));
        }
        Ok(())
    }
}
