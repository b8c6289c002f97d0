use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailgunSettings {
    pub api_key: String,
    pub domain: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub upload_dir: String,
    pub seed_demo_data: bool,
    pub mailgun: Option<MailgunSettings>,
    pub restock_recipient: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/pharmacy.db".into(),
            upload_dir: "./data/images".into(),
            seed_demo_data: true,
            mailgun: None,
            restock_recipient: None,
        }
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string("server.toml").ok();
    settings_from(file.as_deref(), |key| std::env::var(key).ok())
}

/// Layers `server.toml` content and then environment variables over the defaults.
pub(crate) fn settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    let file_cfg = file
        .and_then(|raw| toml::from_str::<HashMap<String, toml::Value>>(raw).ok())
        .unwrap_or_default();
    let from_file = |key: &str| {
        file_cfg.get(key).map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    };

    if let Some(v) = from_file("bind_addr") {
        settings.server_bind = v;
    }
    if let Some(v) = from_file("database_url") {
        settings.database_url = v;
    }
    if let Some(v) = from_file("upload_dir") {
        settings.upload_dir = v;
    }
    if let Some(v) = from_file("seed_demo_data").and_then(|v| parse_flag(&v)) {
        settings.seed_demo_data = v;
    }
    if let Some(v) = from_file("restock_recipient") {
        settings.restock_recipient = Some(v);
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = env("APP__UPLOAD_DIR") {
        settings.upload_dir = v;
    }
    if let Some(v) = env("APP__SEED_DEMO_DATA").and_then(|v| parse_flag(&v)) {
        settings.seed_demo_data = v;
    }
    if let Some(v) = env("APP__RESTOCK_RECIPIENT").filter(|v| !v.trim().is_empty()) {
        settings.restock_recipient = Some(v);
    }

    let api_key = env("MAILGUN_API_KEY").or_else(|| from_file("mailgun_api_key"));
    let domain = env("MAILGUN_DOMAIN").or_else(|| from_file("mailgun_domain"));
    if let (Some(api_key), Some(domain)) = (api_key, domain) {
        let from = env("MAILGUN_FROM")
            .or_else(|| from_file("mailgun_from"))
            .unwrap_or_else(|| format!("Pharmacy <postmaster@{domain}>"));
        settings.mailgun = Some(MailgunSettings {
            api_key,
            domain,
            from,
        });
    }

    settings
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.starts_with("sqlite://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
