use crate::core::error::YalcError;

/// Render an error with a remediation hint underneath when one applies.
pub fn format_error_with_help(error: &YalcError) -> String {
    let mut message = format!("Error: {}", error);
    if let Some(help) = help_for(error) {
        message.push_str("\n\n  help: ");
        message.push_str(help);
    }
    message
}

fn help_for(error: &YalcError) -> Option<&'static str> {
    match error {
        YalcError::InvalidManifest { .. } => {
            Some("package.json must declare a non-empty \"name\" and \"version\"")
        }
        YalcError::ScriptFailed { .. } => {
            Some("fix the failing script or pass --no-scripts to skip lifecycle scripts")
        }
        YalcError::LocalDependencies(_) => {
            Some("run `yalc remove --all` before committing package.json")
        }
        YalcError::Lockfile(_) => Some("delete yalc.lock and re-add the packages"),
        YalcError::Store(_) => Some("run `yalc dir` to see which store folder is in use"),
        YalcError::Config(_) => Some("check .yalcrc.yaml / .yalcrc.json in the project"),
        YalcError::Json(_) => Some("the file is not valid JSON"),
        _ => None,
    }
}
