//! Core building blocks shared by the yalc binary and library: errors,
//! persisted paths, package.json handling and lifecycle scripts.

pub mod core;
pub mod package;
pub mod scripts;

pub use core::{format_error_with_help, PackageRef, YalcError, YalcResult};
pub use package::{DependencyKind, PackageManifest};
pub use scripts::{PackageManager, ScriptRunner};
