//! Show the committed spells as a tree.
//!
//! ```text
//! apt
//!   python3 (saved)
//!   ├── libpython3-stdlib
//!   └── python3-doc (optional)
//! url
//!   https://example.com/file.txt -> data/file.txt
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::common::CommandContext;
use crate::cache::SpellCache;
use crate::config::GlobalConfig;
use crate::manifest::Manifest;
use crate::spell::{APT_MODULE, Spell, URL_MODULE, UrlSpell};

/// Command to list committed spells.
#[derive(Args)]
pub struct ListCommand {
    /// Only list the spells of this module
    #[arg(short, long)]
    module: Option<String>,
}

impl ListCommand {
    /// Run against the manifest at `manifest_path` or the discovered one.
    pub async fn execute_with_manifest_path(self, manifest_path: Option<PathBuf>) -> Result<()> {
        let ctx = CommandContext::discover(manifest_path)?;
        if ctx.manifest.is_empty() {
            println!("No spells committed");
            return Ok(());
        }

        // Saved markers are best effort; listing works without a cache
        let config = GlobalConfig::load().await?;
        let cache = match config.cache_dir().and_then(|dir| SpellCache::open(&dir)) {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::debug!("Listing without cache: {e:#}");
                None
            }
        };

        let saved = SavedIn {
            cache: cache.as_ref(),
            project_dir: &ctx.project_dir,
        };
        print!("{}", render(&ctx.manifest, &saved, self.module.as_deref()));
        Ok(())
    }
}

/// Answers whether a spell has been saved into one project.
#[derive(Debug, Clone, Copy)]
pub struct SavedIn<'a> {
    /// Cache holding the saved markers, if one could be opened
    pub cache: Option<&'a SpellCache>,
    /// Project whose artifacts count
    pub project_dir: &'a Path,
}

impl SavedIn<'_> {
    fn apt(&self, name: &str) -> bool {
        let dir = self.project_dir.join(APT_MODULE);
        self.cache.is_some_and(|cache| cache.is_saved(APT_MODULE, name, &dir))
    }

    fn url(&self, spell: &UrlSpell) -> bool {
        let dest = self.project_dir.join(URL_MODULE).join(spell.storage_path());
        self.cache.is_some_and(|cache| cache.is_saved(URL_MODULE, &spell.name, &dest))
            && dest.exists()
    }
}

/// Render the manifest sections selected by `only` (all when `None`).
#[must_use]
pub fn render(manifest: &Manifest, saved: &SavedIn<'_>, only: Option<&str>) -> String {
    let selected = |module: &str| only.is_none_or(|only| only == module);

    let mut out = String::new();

    if selected(APT_MODULE) && !manifest.apt.is_empty() {
        let _ = writeln!(out, "{}", APT_MODULE.cyan().bold());
        for spell in &manifest.apt {
            let _ = writeln!(out, "  {}", label(&spell.name, false, saved.apt(&spell.name)));
            render_dependencies(&mut out, spell, "  ", saved);
        }
    }

    if selected(URL_MODULE) && !manifest.url.is_empty() {
        let _ = writeln!(out, "{}", URL_MODULE.cyan().bold());
        for spell in &manifest.url {
            let _ = writeln!(out, "  {}", url_label(spell, saved.url(spell)));
        }
    }

    out
}

fn render_dependencies(
    out: &mut String,
    spell: &Spell,
    prefix: &str,
    saved: &SavedIn<'_>,
) {
    let count = spell.dependencies.len();
    for (i, dep) in spell.dependencies.iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        let _ = writeln!(
            out,
            "{prefix}{branch}{}",
            label(&dep.name, dep.optional, saved.apt(&dep.name))
        );
        let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        render_dependencies(out, dep, &child_prefix, saved);
    }
}

fn label(name: &str, optional: bool, saved: bool) -> String {
    let mut label = name.to_string();
    if optional {
        let _ = write!(label, " {}", "(optional)".dimmed());
    }
    if saved {
        let _ = write!(label, " {}", "(saved)".green());
    }
    label
}

fn url_label(spell: &UrlSpell, saved: bool) -> String {
    let mut label = spell.name.clone();
    if let Some(output) = &spell.output {
        let _ = write!(label, " -> {}", output.display());
    }
    if saved {
        let _ = write!(label, " {}", "(saved)".green());
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        Manifest {
            apt: vec![
                Spell::new("python3")
                    .with_dependency(Spell::new("libpython3-stdlib"))
                    .with_dependency(Spell::optional("python3-doc")),
            ],
            url: vec![UrlSpell::new("https://example.com/file.txt").with_output("data/file.txt")],
        }
    }

    #[test]
    fn test_render_tree() {
        colored::control::set_override(false);
        let saved = SavedIn {
            cache: None,
            project_dir: Path::new("/p"),
        };
        let out = render(&sample(), &saved, None);
        assert_eq!(
            out,
            "apt\n  python3\n  ├── libpython3-stdlib\n  └── python3-doc (optional)\n\
             url\n  https://example.com/file.txt -> data/file.txt\n"
        );
    }

    #[tokio::test]
    async fn test_render_saved_and_filtered() {
        colored::control::set_override(false);
        let cache = SpellCache::in_memory();
        cache.mark_saved(APT_MODULE, "python3", Path::new("/p/apt")).await.unwrap();
        let saved = SavedIn {
            cache: Some(&cache),
            project_dir: Path::new("/p"),
        };

        let out = render(&sample(), &saved, Some("apt"));
        assert!(out.contains("python3 (saved)"));
        assert!(!out.contains("libpython3-stdlib (saved)"));
        assert!(!out.contains("url"));

        // Markers recorded for another project do not count
        let elsewhere = SavedIn {
            cache: Some(&cache),
            project_dir: Path::new("/q"),
        };
        assert!(!render(&sample(), &elsewhere, None).contains("(saved)"));
    }
}
