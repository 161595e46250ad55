use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "lingo.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    pub user_id: String,
    pub user_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/lingo.sqlite3".into(),
            user_id: "local".into(),
            user_name: None,
        }
    }
}

/// Command-line overrides, applied after the file and the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub database_url: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

/// Defaults, then the config file, then `LINGO_*` variables, then `overrides`.
///
/// A missing config file is not an error; a malformed one is.
pub fn load_settings(config: Option<&Path>, overrides: Overrides) -> anyhow::Result<Settings> {
    let path = config.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
    let mut settings = match fs::read_to_string(&path) {
        Ok(raw) => toml::from_str::<Settings>(&raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if config.is_none() && err.kind() == std::io::ErrorKind::NotFound => {
            Settings::default()
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
    };

    settings.apply_env(|key| std::env::var(key).ok());
    settings.apply_overrides(overrides);
    Ok(settings)
}

impl Settings {
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("LINGO_DB_URL") {
            self.database_url = v;
        }
        if let Some(v) = lookup("LINGO_USER_ID") {
            self.user_id = v;
        }
        if let Some(v) = lookup("LINGO_USER_NAME") {
            self.user_name = Some(v);
        }
    }

    fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(v) = overrides.database_url {
            self.database_url = v;
        }
        if let Some(v) = overrides.user_id {
            self.user_id = v;
        }
        if let Some(v) = overrides.user_name {
            self.user_name = Some(v);
        }
    }
}

/// Normalize a database setting into a `sqlite://` URL and create the
/// parent directory of the database file.
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

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url
        .strip_prefix("sqlite:")
        .unwrap_or(raw_database_url);
    format!("sqlite://{}", path.replace('\\', "/"))
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
    })
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

    if path.is_empty() || path.starts_with("file:") {
        return None;
    }
    Some(PathBuf::from(path))
}
