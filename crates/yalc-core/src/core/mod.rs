pub mod error;
pub mod error_help;
pub mod path;
pub mod version;

pub use error::{YalcError, YalcResult};
pub use error_help::format_error_with_help;
pub use version::{validate_package_name, PackageRef};
