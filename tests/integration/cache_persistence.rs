use anyhow::Result;
use credo_cli::cache::SpellCache;
use credo_cli::modules::{AptModule, Module, ModuleContext, UrlModule};
use credo_cli::project::ProjectRoot;
use credo_cli::spell::{Spell, SpellEntry, UrlSpell};
use credo_cli::suggest::Suggestions;
use credo_cli::test_utils::{MockAptClient, MockDownloader, TestProject, init_test_logging};
use std::path::Path;
use std::sync::Arc;

fn context_with(cache: Arc<SpellCache>, root: &Path) -> ModuleContext {
    ModuleContext::new(cache, Arc::new(Suggestions::new()), Arc::new(ProjectRoot::new(root)))
}

#[tokio::test]
async fn test_resolution_survives_reopen() -> Result<()> {
    init_test_logging(None);
    let project = TestProject::with_durable_cache()?;
    let cache_dir = project.path().join(".cache");

    let first_client = Arc::new(MockAptClient::new().with_package("git", &["libc6", "<git-doc>"]));
    let first = AptModule::new(project.context(), first_client.clone());
    let resolved = first.resolve(SpellEntry::Apt(Spell::new("git"))).await?;
    assert_eq!(first_client.update_calls(), 1);

    // A later run opens the same directory with a client that knows nothing
    let reopened = Arc::new(SpellCache::open(&cache_dir)?);
    assert_eq!(reopened.len(), 1);
    let second_client = Arc::new(MockAptClient::new());
    let second = AptModule::new(context_with(reopened, project.path()), second_client.clone());

    let cached = second.resolve(SpellEntry::Apt(Spell::new("git"))).await?;
    assert_eq!(cached, resolved);
    assert_eq!(second_client.total_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_saved_marker_survives_reopen() -> Result<()> {
    let project = TestProject::with_durable_cache()?;
    let cache_dir = project.path().join(".cache");
    let url = "https://example.com/archive.zip";

    let downloader = Arc::new(MockDownloader::new().with_file(url, b"PK"));
    let module = UrlModule::new(project.context(), downloader.clone());
    module.save(&SpellEntry::Url(UrlSpell::new(url))).await?;
    assert_eq!(downloader.calls(), 1);

    let reopened = Arc::new(SpellCache::open(&cache_dir)?);
    let dest = project.path().join("url").join(UrlSpell::new(url).storage_path());
    assert!(reopened.is_saved("url", url, &dest));

    let again = Arc::new(MockDownloader::new());
    let module = UrlModule::new(context_with(reopened, project.path()), again.clone());
    module.save(&SpellEntry::Url(UrlSpell::new(url))).await?;
    assert_eq!(again.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_cache_starts_empty() -> Result<()> {
    let project = TestProject::new()?;
    let cache_dir = project.path().join("cache");
    std::fs::create_dir_all(&cache_dir)?;
    std::fs::write(cache_dir.join("spells.json"), "{ not json")?;

    let cache = Arc::new(SpellCache::open(&cache_dir)?);
    assert!(cache.is_empty());

    let client = Arc::new(MockAptClient::new().with_package("zlib1g", &[]));
    let module = AptModule::new(context_with(cache.clone(), project.path()), client.clone());
    module.resolve(SpellEntry::Apt(Spell::new("zlib1g"))).await?;

    // The next insert rewrites the file
    let reopened = SpellCache::open(&cache_dir)?;
    assert_eq!(reopened.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_saved_marker_does_not_cover_other_projects() -> Result<()> {
    let first = TestProject::with_durable_cache()?;
    let second = TestProject::new()?;
    let url = "https://example.com/archive.zip";
    let downloader = Arc::new(MockDownloader::new().with_file(url, b"PK"));

    UrlModule::new(first.context(), downloader.clone())
        .save(&SpellEntry::Url(UrlSpell::new(url)))
        .await?;

    // Same durable cache, different project root
    let reopened = Arc::new(SpellCache::open(&first.path().join(".cache"))?);
    let module = UrlModule::new(context_with(reopened, second.path()), downloader.clone());
    module.save(&SpellEntry::Url(UrlSpell::new(url))).await?;
    module.apply(&SpellEntry::Url(UrlSpell::new(url))).await?;

    assert_eq!(downloader.calls(), 2);
    assert_eq!(std::fs::read(second.path().join("archive.zip"))?, b"PK");
    Ok(())
}
