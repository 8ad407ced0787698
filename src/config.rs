use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::SearchMode;

const DEFAULT_ENV_PREFIX: &str = "POSTFEED";

pub const DEFAULT_FEED_URL: &str = "https://api.myjson.com/bins/152f9j";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_user_agent() -> String {
    format!("post-feed/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchConfig {
    #[serde(default)]
    pub literal: bool,
}

impl SearchConfig {
    pub fn mode(&self) -> SearchMode {
        if self.literal {
            SearchMode::Literal
        } else {
            SearchMode::Pattern
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_log_level() -> String {
    "warn".into()
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("post-feed").join("post-feed.log"))
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.feed.url.trim().is_empty() {
        base.feed.url = other.feed.url;
    }
    if !other.feed.user_agent.trim().is_empty() {
        base.feed.user_agent = other.feed.user_agent;
    }
    if !other.feed.timeout.is_zero() {
        base.feed.timeout = other.feed.timeout;
    }

    base.search.literal = other.search.literal;

    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    if !other.log.level.trim().is_empty() {
        base.log.level = other.log.level;
    }
    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }

    base
}

/// Environment variables override whatever the file set, one key at a time.
fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "feed.url" => cfg.feed.url = value,
        "feed.user_agent" => cfg.feed.user_agent = value,
        "feed.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.feed.timeout = duration;
            }
        }
        "search.literal" => {
            cfg.search.literal = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        "log.level" => cfg.log.level = value,
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("post-feed").join("config.yaml"))
}
