use anyhow::Result;
use credo_cli::core::CredoError;
use credo_cli::host::HostInfo;
use credo_cli::manifest::Manifest;
use credo_cli::modules::{Module, ModuleRegistry};
use credo_cli::spell::{Spell, SpellEntry, UrlSpell};
use credo_cli::test_utils::{MockAptClient, MockDownloader, TestProject};
use std::sync::Arc;
use std::time::Duration;

fn python_client() -> MockAptClient {
    MockAptClient::new()
        .with_package("python3", &["libpython3-stdlib", "python3-minimal", "<python3-doc>"])
        .with_package("libpython3-stdlib", &["libc6"])
        .with_package("python3-minimal", &[])
        .with_package("python3-doc", &[])
        .with_package("libc6", &[])
        .with_package("curl", &["libcurl4"])
        .with_package("libcurl4", &[])
}

fn ubuntu() -> HostInfo {
    HostInfo::new("ubuntu", ["debian"])
}

fn cli_args(module: &dyn Module, items: &[&str]) -> clap::ArgMatches {
    let argv = std::iter::once(module.name()).chain(items.iter().copied());
    module.cli_config().try_get_matches_from(argv).unwrap()
}

#[tokio::test]
async fn test_resolve_commit_save_apply() -> Result<()> {
    let project = TestProject::new()?;
    let apt = Arc::new(python_client());
    let downloader =
        Arc::new(MockDownloader::new().with_file("https://example.com/tool.tar.gz", b"tarball"));
    let registry =
        ModuleRegistry::for_host_with(&ubuntu(), project.context(), apt.clone(), downloader);

    let mut manifest = Manifest::new();
    let apt_module = registry.get("apt").unwrap();
    let summary =
        apt_module.run(&mut manifest, &cli_args(apt_module.as_ref(), &["python3"])).await?;
    assert_eq!(summary.committed, vec!["python3".to_string()]);

    let url_module = registry.get("url").unwrap();
    url_module
        .run(
            &mut manifest,
            &cli_args(
                url_module.as_ref(),
                &["https://example.com/tool.tar.gz", "-o", "vendor/tool.tar.gz"],
            ),
        )
        .await?;

    // Persist and reload like the CLI does between invocations
    let manifest_path = project.write_manifest(&manifest)?;
    let manifest = Manifest::load(&manifest_path)?;

    let python3 = &manifest.apt[0];
    assert_eq!(python3.name, "python3");
    let deps: Vec<(&str, bool)> =
        python3.dependencies.iter().map(|d| (d.name.as_str(), d.optional)).collect();
    assert_eq!(
        deps,
        vec![("libpython3-stdlib", false), ("python3-minimal", false), ("python3-doc", true)]
    );

    let suggestions = project.suggestions.all();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].suggested, "python3-doc");

    for module in registry.all() {
        module.bulk_save(&manifest).await?;
    }
    // Required children first, then the spell; optional ones skipped
    assert_eq!(apt.downloaded(), vec!["libpython3-stdlib", "python3-minimal", "python3"]);
    let stored = UrlSpell::new("https://example.com/tool.tar.gz").storage_path();
    assert!(project.path().join("url").join(stored).exists());

    for module in registry.all() {
        module.bulk_apply(&manifest).await?;
    }
    assert_eq!(apt.installed().len(), 3);
    assert_eq!(std::fs::read(project.path().join("vendor/tool.tar.gz"))?, b"tarball");

    Ok(())
}

#[tokio::test]
async fn test_bulk_save_is_idempotent() -> Result<()> {
    let project = TestProject::new()?;
    let apt = Arc::new(python_client());
    let registry = ModuleRegistry::for_host_with(
        &ubuntu(),
        project.context(),
        apt.clone(),
        Arc::new(MockDownloader::new()),
    );

    let mut manifest = Manifest::new();
    manifest.apt.push(Spell::new("curl").with_dependency(Spell::new("libcurl4")));

    let module = registry.get("apt").unwrap();
    module.bulk_save(&manifest).await?;
    module.bulk_save(&manifest).await?;

    assert_eq!(apt.download_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_bulk_acts_on_optional_top_level_spells() -> Result<()> {
    let project = TestProject::new()?;
    let apt = Arc::new(python_client());
    let registry = ModuleRegistry::for_host_with(
        &ubuntu(),
        project.context(),
        apt.clone(),
        Arc::new(MockDownloader::new()),
    );

    let mut manifest = Manifest::new();
    manifest.apt.push(Spell::optional("python3-doc"));
    manifest.apt.push(Spell::new("curl").with_dependency(Spell::optional("libcurl4")));

    let module = registry.get("apt").unwrap();
    module.bulk_save(&manifest).await?;
    assert_eq!(apt.downloaded(), vec!["python3-doc", "curl"]);

    module.bulk_apply(&manifest).await?;
    let installed = apt.installed();
    assert_eq!(installed.len(), 2);
    assert!(installed[0].ends_with("python3-doc_1.0_amd64.deb"));
    assert!(installed[1].ends_with("curl_1.0_amd64.deb"));
    Ok(())
}

#[tokio::test]
async fn test_bulk_apply_stops_at_first_failure() -> Result<()> {
    let project = TestProject::new()?;
    let apt = Arc::new(python_client().fail_install("libcurl4"));
    let registry = ModuleRegistry::for_host_with(
        &ubuntu(),
        project.context(),
        apt.clone(),
        Arc::new(MockDownloader::new()),
    );

    let mut manifest = Manifest::new();
    manifest.apt.push(Spell::new("curl").with_dependency(Spell::new("libcurl4")));
    manifest.apt.push(Spell::new("python3-minimal"));

    let module = registry.get("apt").unwrap();
    module.bulk_save(&manifest).await?;
    let err = module.bulk_apply(&manifest).await.unwrap_err();

    assert!(err.chain().any(|cause| matches!(
        cause.downcast_ref::<CredoError>(),
        Some(CredoError::AptCommandError { .. })
    )));
    assert_eq!(apt.install_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_registry_instances_share_refresh_lock() -> Result<()> {
    let project = TestProject::new()?;
    let apt = Arc::new(python_client().with_update_delay(Duration::from_millis(20)));
    let registry = ModuleRegistry::for_host_with(
        &ubuntu(),
        project.context(),
        apt.clone(),
        Arc::new(MockDownloader::new()),
    );

    let first = registry.get("apt").unwrap();
    let second = registry.get("apt").unwrap();
    let third = registry.get("apt").unwrap();

    let (a, b, c) = tokio::join!(
        first.resolve(SpellEntry::Apt(Spell::new("python3"))),
        second.resolve(SpellEntry::Apt(Spell::new("curl"))),
        third.resolve(SpellEntry::Apt(Spell::new("libc6"))),
    );
    a?;
    b?;
    c?;

    assert_eq!(apt.update_calls(), 3);
    assert_eq!(apt.max_concurrent_updates(), 1);
    Ok(())
}

#[tokio::test]
async fn test_modules_reject_foreign_spells() -> Result<()> {
    let project = TestProject::new()?;
    let registry = ModuleRegistry::for_host_with(
        &ubuntu(),
        project.context(),
        Arc::new(python_client()),
        Arc::new(MockDownloader::new()),
    );
    let mut manifest = Manifest::new();

    let apt = registry.get("apt").unwrap();
    let err = apt.commit(&mut manifest, SpellEntry::Url(UrlSpell::new("https://example.com/a")));
    assert!(matches!(
        err.unwrap_err().downcast_ref::<CredoError>(),
        Some(CredoError::Converting { .. })
    ));

    let url = registry.get("url").unwrap();
    let err = url.save(&SpellEntry::Apt(Spell::new("curl"))).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<CredoError>(), Some(CredoError::Converting { .. })));

    assert!(manifest.is_empty());
    Ok(())
}
