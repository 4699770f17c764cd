//! Configuration and settings tests

use shipyard::config::EnvironmentConfig;
use shipyard::errors::DeployError;
use shipyard::storage::layout::{ConfigLayout, KeyStrategy};
use shipyard::storage::settings::Settings;
use shipyard::filesys::file::File;

const CONFIG: &str = r#"
services:
  api:
    image: registry/api:1
    count: 2
    dc_region: eu
"#;

fn write(root: &std::path::Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_key_strategies_resolve_different_directories() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "datacenters/dc1/config.yml", CONFIG);

    let by_dc = ConfigLayout::new(dir.path(), KeyStrategy::Datacenters);
    let config = tokio_test::block_on(EnvironmentConfig::load(&by_dc, "dc1")).unwrap();
    assert_eq!(config.find("api").unwrap().region_tag, "eu");

    let by_env = ConfigLayout::new(dir.path(), KeyStrategy::Environments);
    let err = tokio_test::block_on(EnvironmentConfig::load(&by_env, "dc1")).unwrap_err();
    assert!(matches!(err, DeployError::ConfigNotFound(_)));
}

#[test]
fn test_image_update_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "environments/prod/config.yml", CONFIG);
    let layout = ConfigLayout::new(dir.path(), KeyStrategy::Environments);

    let mut config = tokio_test::block_on(EnvironmentConfig::load(&layout, "prod")).unwrap();
    config.set_image("api", "registry/api:2").unwrap();
    tokio_test::block_on(config.save()).unwrap();

    let reloaded = tokio_test::block_on(EnvironmentConfig::load(&layout, "prod")).unwrap();
    let api = reloaded.find("api").unwrap();
    assert_eq!(api.image, "registry/api:2");
    assert_eq!(api.count, 2);
    assert_eq!(api.region_tag, "eu");
}

#[test]
fn test_settings_defaults_and_overrides() {
    let dir = tempfile::tempdir().unwrap();

    let missing = File::new(dir.path().join("settings.json"));
    let settings = tokio_test::block_on(Settings::load(&missing)).unwrap();
    assert_eq!(settings.scheduler.address, "http://127.0.0.1:4646");
    assert_eq!(settings.supervision.eval_timeout().as_secs(), 120);

    write(
        dir.path(),
        "settings.json",
        r#"{"log_level": "debug", "repository": {"root": "/srv/deploy", "layout": "datacenters"}}"#,
    );
    let settings = tokio_test::block_on(Settings::load(&missing)).unwrap();
    assert_eq!(settings.repository.layout, KeyStrategy::Datacenters);
    assert_eq!(settings.supervision.watch_wait().as_secs(), 5);
}
