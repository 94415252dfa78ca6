//! Monorepo detection.

pub mod finder;

pub use finder::{WorkspaceFinder, WorkspaceMarker};
