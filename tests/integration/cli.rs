use predicates::prelude::*;

use crate::common::CliProject;

#[test]
fn test_init_creates_manifest() {
    let project = CliProject::new();

    project
        .credo()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized credospell.toml"));

    assert!(project.manifest_path().exists());

    project
        .credo()
        .arg("init")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    project.credo().args(["init", "--force"]).assert().success();
}

#[test]
fn test_missing_manifest_suggests_init() {
    let project = CliProject::new();

    project
        .credo()
        .arg("list")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("credospell.toml not found"))
        .stderr(predicate::str::contains("credo init"));
}

#[test]
fn test_unknown_module_is_not_available() {
    let project = CliProject::new();
    project.credo().arg("init").assert().success();

    project
        .credo()
        .args(["brew", "curl"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Module 'brew' is not available"));

    project
        .credo()
        .args(["urls", "https://example.com/a.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Did you mean 'url'?"));
}

#[test]
fn test_module_without_item_is_usage_error() {
    let project = CliProject::new();
    project.credo().arg("init").assert().success();

    project
        .credo()
        .arg("url")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_modules_lists_url() {
    let project = CliProject::new();

    project.credo().arg("modules").assert().success().stdout(predicate::str::contains("url"));
}

#[test]
fn test_url_commit_and_list() {
    let project = CliProject::new();
    project.credo().arg("init").assert().success();

    project
        .credo()
        .args(["url", "https://example.com/files/data.csv", "--output", "data/data.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added https://example.com/files/data.csv to url"));

    let manifest = project.read_manifest();
    assert!(manifest.contains("[[url]]"));
    assert!(manifest.contains("name = \"https://example.com/files/data.csv\""));
    assert!(manifest.contains("output = \"data/data.csv\""));

    // Committing the same spell again is not an error
    project
        .credo()
        .args(["url", "https://example.com/files/data.csv", "--output", "data/data.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already in url"));
    assert_eq!(project.read_manifest().matches("[[url]]").count(), 1);

    project
        .credo()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.com/files/data.csv -> data/data.csv"));

    assert!(project.cache_dir().join("spells.json").exists());
}

#[test]
fn test_invalid_url_is_rejected() {
    let project = CliProject::new();
    project.credo().arg("init").assert().success();
    let before = project.read_manifest();

    project
        .credo()
        .args(["url", "ftp://example.com/a.txt"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid URL"));

    assert_eq!(project.read_manifest(), before);
}

#[test]
fn test_manifest_path_from_another_directory() {
    let project = CliProject::new();
    project.credo().arg("init").assert().success();

    let elsewhere = project.path().parent().unwrap().to_path_buf();
    project
        .credo_in(&elsewhere)
        .arg("--manifest-path")
        .arg(project.manifest_path())
        .arg("save")
        .assert()
        .success()
        .stdout(predicate::str::contains("No spells to save"));
}

#[test]
fn test_manifest_discovered_from_subdirectory() {
    let project = CliProject::new();
    project.credo().arg("init").assert().success();
    project.credo().args(["url", "https://example.com/a.txt"]).assert().success();

    let nested = project.path().join("src").join("deep");
    std::fs::create_dir_all(&nested).unwrap();

    project
        .credo_in(&nested)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.com/a.txt"));
}
