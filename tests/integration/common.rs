//! Helpers for running the `credo` binary against a temporary project.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary project directory plus a private global config whose cache
/// lives inside the temporary tree.
pub struct CliProject {
    temp: TempDir,
    config_path: PathBuf,
}

impl CliProject {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        std::fs::create_dir_all(&project).unwrap();

        let config_path = temp.path().join("config.toml");
        let cache_dir = temp.path().join("cache");
        std::fs::write(
            &config_path,
            format!(
                "cache_dir = {:?}\nshow_suggestions = false\n",
                cache_dir.display().to_string()
            ),
        )
        .unwrap();

        Self {
            temp,
            config_path,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.temp.path().join("project")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path().join("credospell.toml")
    }

    pub fn read_manifest(&self) -> String {
        std::fs::read_to_string(self.manifest_path()).unwrap()
    }

    /// `credo` running in the project directory with the private config.
    pub fn credo(&self) -> Command {
        self.credo_in(&self.path())
    }

    /// `credo` running in `dir` with the private config.
    pub fn credo_in(&self, dir: &Path) -> Command {
        let mut cmd = Command::cargo_bin("credo").unwrap();
        cmd.current_dir(dir)
            .env("CREDO_CONFIG", &self.config_path)
            .env_remove("CREDO_MANIFEST")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}
