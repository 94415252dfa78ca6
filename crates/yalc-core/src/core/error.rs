use std::path::PathBuf;
use thiserror::Error;

pub type YalcResult<T> = Result<T, YalcError>;

#[derive(Error, Debug)]
pub enum YalcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Package error: {0}")]
    Package(String),

    /// package.json exists but lacks a usable name or version.
    #[error("Invalid manifest {}: {reason}", path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Lockfile error: {0}")]
    Lockfile(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Packlist error: {0}")]
    Packlist(String),

    #[error("WalkDir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// A lifecycle script exited non-zero. Publish and add treat this as fatal.
    #[error("Script '{script}' failed with exit code {code}")]
    ScriptFailed { script: String, code: i32 },

    /// `check` found dependencies that still point into `.yalc`.
    #[error("Local dependencies detected: {}", .0.join(", "))]
    LocalDependencies(Vec<String>),

    /// A subprocess exited with a non-zero status code.
    /// The exit code should be propagated to the shell.
    #[error("Command exited with code {0}")]
    SubprocessExit(i32),
}

impl YalcError {
    /// Exit code the binary should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            YalcError::SubprocessExit(code) => *code,
            YalcError::ScriptFailed { code, .. } => *code,
            _ => 1,
        }
    }
}
