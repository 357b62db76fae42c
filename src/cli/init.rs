//! Create a new `credospell.toml`.
//!
//! # Examples
//!
//! ```bash
//! # In the current directory
//! credo init
//!
//! # Somewhere else, replacing an existing manifest
//! credo init --path ./provisioning --force
//! ```

use anyhow::{Result, anyhow};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

use crate::constants::MANIFEST_FILE_NAME;

const TEMPLATE: &str = r#"# credo spell manifest
#
# Sections are managed by `credo <module> <item>...`; edit by hand only to
# remove spells or to adjust url output paths and checksums.
#
# [[apt]]
# name = "python3"
#
# [[url]]
# name = "https://example.com/file.txt"
# output = "data/file.txt"
"#;

/// Command to initialize a new spell manifest.
#[derive(Args)]
pub struct InitCommand {
    /// Directory to create the manifest in (defaults to current directory)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Overwrite an existing manifest
    #[arg(short, long)]
    force: bool,
}

impl InitCommand {
    /// Write the manifest template, creating the directory if needed.
    pub async fn execute(self) -> Result<()> {
        let target_dir = self.path.unwrap_or_else(|| PathBuf::from("."));
        let manifest_path = target_dir.join(MANIFEST_FILE_NAME);

        if manifest_path.exists() && !self.force {
            return Err(anyhow!(
                "Manifest already exists at {}. Use --force to overwrite",
                manifest_path.display()
            ));
        }

        if !target_dir.exists() {
            fs::create_dir_all(&target_dir)?;
        }

        fs::write(&manifest_path, TEMPLATE)?;

        println!(
            "{} Initialized {} at {}",
            "✓".green(),
            MANIFEST_FILE_NAME,
            manifest_path.display()
        );
        println!("\n{}", "Next steps:".cyan());
        println!("  Add spells with {}:", "credo <module> <item>".bright_white());
        println!("    credo apt python3");
        println!("    credo url https://example.com/file.txt --output data/file.txt");
        println!(
            "\n  Then run {} and {}",
            "credo save".bright_white(),
            "credo apply".bright_white()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_loadable_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let cmd = InitCommand {
            path: Some(temp_dir.path().to_path_buf()),
            force: false,
        };
        cmd.execute().await.unwrap();

        let manifest_path = temp_dir.path().join(MANIFEST_FILE_NAME);
        let manifest = Manifest::load(&manifest_path).unwrap();
        assert!(manifest.is_empty());
    }

    #[tokio::test]
    async fn test_init_creates_directory_if_not_exists() {
        let temp_dir = TempDir::new().unwrap();
        let new_dir = temp_dir.path().join("new_project");

        let cmd = InitCommand {
            path: Some(new_dir.clone()),
            force: false,
        };
        cmd.execute().await.unwrap();

        assert!(new_dir.join(MANIFEST_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_init_fails_if_manifest_exists() {
        let temp_dir = TempDir::new().unwrap();
        let manifest_path = temp_dir.path().join(MANIFEST_FILE_NAME);
        fs::write(&manifest_path, "[[apt]]\nname = \"curl\"\n").unwrap();

        let cmd = InitCommand {
            path: Some(temp_dir.path().to_path_buf()),
            force: false,
        };

        let result = cmd.execute().await;
        assert!(result.unwrap_err().to_string().contains("already exists"));
        assert!(fs::read_to_string(&manifest_path).unwrap().contains("curl"));
    }

    #[tokio::test]
    async fn test_init_force_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let manifest_path = temp_dir.path().join(MANIFEST_FILE_NAME);
        fs::write(&manifest_path, "[[apt]]\nname = \"curl\"\n").unwrap();

        let cmd = InitCommand {
            path: Some(temp_dir.path().to_path_buf()),
            force: true,
        };
        cmd.execute().await.unwrap();

        assert!(Manifest::load(&manifest_path).unwrap().is_empty());
    }
}
