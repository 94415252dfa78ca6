pub mod manifest;

pub use manifest::{DependencyKind, PackageManifest};
