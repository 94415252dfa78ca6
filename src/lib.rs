//! Yalc: a local package store and linker.
//!
//! Packages are published into a shared store and linked into consuming
//! projects by copy, symlink, the `workspace:` protocol, or as a bare
//! local copy. Core types live in `yalc-core` and are re-exported here.

pub use yalc_core::{
    format_error_with_help, DependencyKind, PackageManager, PackageManifest, PackageRef,
    ScriptRunner, YalcError, YalcResult,
};

/// Errors, persisted paths and version handling from yalc-core.
pub mod core {
    pub use yalc_core::core::*;

    pub mod path {
        pub use yalc_core::core::path::*;
    }
}

/// Lifecycle scripts and package manager detection.
pub mod scripts {
    pub use yalc_core::scripts::*;
}

/// Layered configuration.
pub mod config;

/// Lockfile, add, update and remove flows.
pub mod package;

/// `workspace:` and `catalog:` dependency rewriting.
pub mod resolver;

/// The shared store, its installations registry and publishing.
pub mod store;

/// Directory mirroring between the store, `.yalc` and node_modules.
pub mod sync;

/// Monorepo detection.
pub mod workspace;
