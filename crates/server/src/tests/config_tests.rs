use super::{normalize_database_url, prepare_database_url, settings_from, Settings};

use std::collections::HashMap;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    assert_eq!(settings_from(None, env_of(&[])), Settings::default());
}

#[test]
fn file_values_are_overridden_by_environment() {
    let file = r#"
        bind_addr = "0.0.0.0:9000"
        database_url = "sqlite://./file.db"
        seed_demo_data = false
        upload_dir = "/srv/images"
    "#;
    let settings = settings_from(
        Some(file),
        env_of(&[
            ("APP__DATABASE_URL", "sqlite://./env.db"),
            ("DATABASE_URL", "sqlite://./ignored.db"),
        ]),
    );
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.database_url, "sqlite://./env.db");
    assert_eq!(settings.upload_dir, "/srv/images");
    assert!(!settings.seed_demo_data);
}

#[test]
fn app_prefixed_bind_wins_over_plain_variable() {
    let settings = settings_from(
        None,
        env_of(&[("SERVER_BIND", "127.0.0.1:1"), ("APP__BIND_ADDR", "127.0.0.1:2")]),
    );
    assert_eq!(settings.server_bind, "127.0.0.1:2");
}

#[test]
fn mailgun_requires_key_and_domain() {
    let partial = settings_from(None, env_of(&[("MAILGUN_API_KEY", "key-123")]));
    assert!(partial.mailgun.is_none());

    let full = settings_from(
        None,
        env_of(&[
            ("MAILGUN_API_KEY", "key-123"),
            ("MAILGUN_DOMAIN", "mg.pharmacy.test"),
            ("APP__RESTOCK_RECIPIENT", "buyer@pharmacy.test"),
        ]),
    );
    let mailgun = full.mailgun.expect("mailgun settings");
    assert_eq!(mailgun.domain, "mg.pharmacy.test");
    assert_eq!(mailgun.from, "Pharmacy <postmaster@mg.pharmacy.test>");
    assert_eq!(full.restock_recipient.as_deref(), Some("buyer@pharmacy.test"));
}

#[test]
fn unparseable_seed_flag_keeps_default() {
    let settings = settings_from(None, env_of(&[("APP__SEED_DEMO_DATA", "maybe")]));
    assert!(settings.seed_demo_data);
    let settings = settings_from(None, env_of(&[("APP__SEED_DEMO_DATA", "off")]));
    assert!(!settings.seed_demo_data);
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:data\\test.db"),
        "sqlite://data/test.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
}

#[test]
fn creates_parent_dir_for_sqlite_path() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.path().join("data").exists());
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("pharmacy.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );
}
