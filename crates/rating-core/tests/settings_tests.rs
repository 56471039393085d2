use rating_core::{Settings, StoreBackend};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings_validate() {
    let settings = Settings::default();
    assert!(settings.validate().is_ok());
    assert_eq!(settings.server.port, 3000);
    assert_eq!(settings.server.body_limit_bytes, 50 * 1024 * 1024);
    assert_eq!(settings.store.backend, StoreBackend::Sparql);
    assert_eq!(settings.pipeline.max_concurrency, 1);
    assert_eq!(
        settings.vocabulary.rating_predicate,
        "http://schema.org/reviewRating"
    );
    assert_eq!(settings.vocabulary.graph, "http://mu.semte.ch/graphs/public");
}

#[test]
fn test_files_are_layered() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("default.toml"),
        r#"
[server]
port = 8080

[store]
backend = "memory"

[pipeline]
max_concurrency = 2
"#,
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("staging.toml"),
        r#"
[pipeline]
max_concurrency = 8

[vocabulary]
graph = "http://example.org/graphs/books"
"#,
    )
    .unwrap();

    let settings = Settings::load_from_sources(temp_dir.path(), "staging").unwrap();
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.store.backend, StoreBackend::Memory);
    assert_eq!(settings.pipeline.max_concurrency, 8);
    assert_eq!(settings.vocabulary.graph, "http://example.org/graphs/books");
    // untouched keys keep their defaults
    assert_eq!(settings.vocabulary.about_predicate, "http://schema.org/about");
    assert!(settings.validate().is_ok());
}

#[test]
fn test_environment_overrides_files() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("default.toml"),
        "[logging]\nlevel = \"warn\"\n",
    )
    .unwrap();

    std::env::set_var("RATING__LOGGING__LEVEL", "rating_graph=trace");
    let settings = Settings::load_from_sources(temp_dir.path(), "test").unwrap();
    std::env::remove_var("RATING__LOGGING__LEVEL");

    assert_eq!(settings.logging.level, "rating_graph=trace");
}

#[test]
fn test_validation_rejects_bad_values() {
    let mut settings = Settings::default();
    settings.pipeline.max_concurrency = 0;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.store.endpoint = "not a url".to_string();
    assert!(settings.validate().is_err());

    // the endpoint is irrelevant for the in-memory backend
    settings.store.backend = StoreBackend::Memory;
    assert!(settings.validate().is_ok());

    let mut settings = Settings::default();
    settings.vocabulary.average_predicate = "  ".to_string();
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.server.host = String::new();
    assert!(settings.validate().is_err());
}
