use std::fmt;
use std::path::Path;

/// Node package managers recognised by their lockfiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManager {
    /// Inspect marker lockfiles in `dir`. Falls back to npm.
    pub fn detect(dir: &Path) -> Self {
        if dir.join("pnpm-lock.yaml").exists() {
            PackageManager::Pnpm
        } else if dir.join("yarn.lock").exists() {
            PackageManager::Yarn
        } else {
            PackageManager::Npm
        }
    }

    /// Executable to spawn. On Windows these are `.cmd` shims.
    pub fn program(self) -> &'static str {
        match (self, cfg!(windows)) {
            (PackageManager::Npm, false) => "npm",
            (PackageManager::Npm, true) => "npm.cmd",
            (PackageManager::Yarn, false) => "yarn",
            (PackageManager::Yarn, true) => "yarn.cmd",
            (PackageManager::Pnpm, false) => "pnpm",
            (PackageManager::Pnpm, true) => "pnpm.cmd",
        }
    }

    /// Program and leading arguments used to run a package.json script.
    pub fn run_command(self) -> (&'static str, &'static [&'static str]) {
        let args: &'static [&'static str] = match self {
            PackageManager::Npm => &["run"],
            PackageManager::Yarn | PackageManager::Pnpm => &[],
        };
        (self.program(), args)
    }

    /// Program and leading arguments used to refresh installed packages.
    pub fn update_command(self) -> (&'static str, &'static [&'static str]) {
        let args: &'static [&'static str] = match self {
            PackageManager::Npm => &["update"],
            PackageManager::Yarn => &["upgrade"],
            PackageManager::Pnpm => &["update"],
        };
        (self.program(), args)
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
        };
        f.write_str(name)
    }
}
