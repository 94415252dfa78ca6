//! Common utilities for integration tests

use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::path::{Path, PathBuf};
use std::process::Command;

pub fn yalc_command() -> Command {
    Command::new(env!("CARGO_BIN_EXE_yalc"))
}

/// Isolated home, config dir and store for one test.
pub struct TestContext {
    pub temp: TempDir,
    pub store: PathBuf,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = temp.child("store").to_path_buf();
        std::fs::create_dir_all(temp.child("config").path()).unwrap();
        Self { temp, store }
    }

    /// `yalc` running in `dir` against this context's store.
    pub fn yalc(&self, dir: &Path) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(env!("CARGO_BIN_EXE_yalc"));
        cmd.current_dir(dir);
        cmd.arg("--store-folder").arg(&self.store);

        let config_dir = self.temp.child("config").to_path_buf();
        if cfg!(target_os = "windows") {
            cmd.env("APPDATA", &config_dir);
            cmd.env("LOCALAPPDATA", self.temp.path());
            cmd.env("USERPROFILE", self.temp.path());
        } else if cfg!(target_os = "linux") {
            cmd.env("XDG_CONFIG_HOME", &config_dir);
            cmd.env("HOME", self.temp.path());
        } else {
            cmd.env("HOME", self.temp.path());
        }
        for key in ["YALC_SIG", "YALC_SCRIPTS", "YALC_QUIET", "YALC_STORE_FOLDER", "RUST_LOG"] {
            cmd.env_remove(key);
        }
        cmd
    }

    /// A publishable package with one source file.
    pub fn library(&self, name: &str, version: &str) -> PathBuf {
        let dir = self.temp.child(name);
        std::fs::create_dir_all(dir.path()).unwrap();
        dir.child("package.json")
            .write_str(&format!(
                "{{\n  \"name\": \"{}\",\n  \"version\": \"{}\",\n  \"main\": \"index.js\"\n}}\n",
                name, version
            ))
            .unwrap();
        dir.child("index.js").write_str("module.exports = 1;\n").unwrap();
        dir.to_path_buf()
    }

    /// A consuming project with an optional existing dependency.
    pub fn app(&self, name: &str, dependency: Option<(&str, &str)>) -> PathBuf {
        let dir = self.temp.child(name);
        std::fs::create_dir_all(dir.path()).unwrap();
        let deps = match dependency {
            Some((dep, spec)) => format!(",\n  \"dependencies\": {{\n    \"{}\": \"{}\"\n  }}", dep, spec),
            None => String::new(),
        };
        dir.child("package.json")
            .write_str(&format!(
                "{{\n  \"name\": \"{}\",\n  \"version\": \"1.0.0\"{}\n}}\n",
                name, deps
            ))
            .unwrap();
        dir.to_path_buf()
    }
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}
