pub mod catalog;
pub mod dependency_resolver;
pub mod workspace_protocol;

pub use catalog::{CatalogCache, CatalogConfig};
pub use dependency_resolver::DependencyResolver;
