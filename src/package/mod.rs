pub mod installer;
pub mod lockfile;
pub mod remover;
pub mod signature;
pub mod updater;

pub mod manifest {
    pub use yalc_core::package::manifest::*;
}

pub use installer::{AddOptions, AddReport, PackageInstaller};
pub use lockfile::{LinkMode, Lockfile, LockfileEntry};
pub use manifest::{DependencyKind, PackageManifest};
pub use remover::{remove_packages, RemoveOptions, RemoveReport};
pub use updater::{update_packages, UpdateOptions, UpdateReport};
