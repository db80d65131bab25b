use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "THOTH";
const API_KEY_FALLBACK_ENVS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub card: CardConfig,
    #[serde(default)]
    pub lab: LabConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Terminals at least this wide get the sidebar; narrower ones the topbar.
    #[serde(default = "default_wide_breakpoint")]
    pub wide_breakpoint: u16,
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width: u16,
    #[serde(default = "default_sidebar_collapsed_width")]
    pub sidebar_collapsed_width: u16,
    #[serde(default = "default_user_name")]
    pub user_name: String,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            wide_breakpoint: default_wide_breakpoint(),
            sidebar_width: default_sidebar_width(),
            sidebar_collapsed_width: default_sidebar_collapsed_width(),
            user_name: default_user_name(),
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

fn default_wide_breakpoint() -> u16 {
    100
}

fn default_sidebar_width() -> u16 {
    26
}

fn default_sidebar_collapsed_width() -> u16 {
    7
}

fn default_user_name() -> String {
    "Moises Alves".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_max_posts")]
    pub max_posts: usize,
    #[serde(default = "default_card_width")]
    pub card_width: u16,
    #[serde(default = "default_card_gap")]
    pub card_gap: u16,
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,
    #[serde(default = "default_permalink_base")]
    pub permalink_base: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_posts: default_max_posts(),
            card_width: default_card_width(),
            card_gap: default_card_gap(),
            fixture_path: None,
            permalink_base: default_permalink_base(),
        }
    }
}

impl FeedConfig {
    /// One scroll step: a card plus the gap after it.
    pub fn scroll_step(&self) -> u16 {
        self.card_width.saturating_add(self.card_gap).max(1)
    }
}

fn default_max_posts() -> usize {
    10
}

fn default_card_width() -> u16 {
    34
}

fn default_card_gap() -> u16 {
    2
}

fn default_permalink_base() -> String {
    "https://thoth.app/posts".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardConfig {
    #[serde(default = "default_truncate_threshold")]
    pub truncate_threshold: usize,
    #[serde(default = "default_tag_cap")]
    pub tag_cap: usize,
    #[serde(default = "default_collage_height")]
    pub collage_height: u16,
    #[serde(default = "default_clamp_lines")]
    pub clamp_lines: usize,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            truncate_threshold: default_truncate_threshold(),
            tag_cap: default_tag_cap(),
            collage_height: default_collage_height(),
            clamp_lines: default_clamp_lines(),
        }
    }
}

fn default_truncate_threshold() -> usize {
    130
}

fn default_tag_cap() -> usize {
    5
}

fn default_collage_height() -> u16 {
    8
}

fn default_clamp_lines() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_search_grounding")]
    pub search_grounding: bool,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(default = "default_download_dir")]
    pub download_dir: Option<PathBuf>,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            image_model: default_image_model(),
            search_grounding: default_search_grounding(),
            request_timeout: default_request_timeout(),
            download_dir: default_download_dir(),
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}

fn default_chat_model() -> String {
    "gemini-3-flash-preview".into()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".into()
}

fn default_search_grounding() -> bool {
    true
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_download_dir() -> Option<PathBuf> {
    dirs::download_dir().or_else(dirs::home_dir)
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
    "info".into()
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("thoth").join("thoth.log"))
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        anyhow::ensure!(
            path.exists(),
            "config: file {} does not exist",
            path.display()
        );
        cfg = read_config_file(path)?;
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            cfg = read_config_file(&default_path)?;
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    for (key, value) in load_env(prefix) {
        apply_env_value(&mut cfg, &key, value);
    }

    if cfg.lab.api_key.trim().is_empty() {
        if let Some(key) = API_KEY_FALLBACK_ENVS
            .iter()
            .find_map(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
        {
            cfg.lab.api_key = key;
        }
    }

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn load_env(prefix: &str) -> HashMap<String, String> {
    let upper_prefix = format!("{}_", prefix.to_uppercase());
    env::vars()
        .filter_map(|(key, value)| {
            key.strip_prefix(&upper_prefix)
                .map(|stripped| (stripped.to_ascii_lowercase().replace("__", "."), value))
        })
        .collect()
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "ui.theme" => cfg.ui.theme = value,
        "ui.wide_breakpoint" => set_parsed(&mut cfg.ui.wide_breakpoint, &value),
        "ui.sidebar_width" => set_parsed(&mut cfg.ui.sidebar_width, &value),
        "ui.sidebar_collapsed_width" => set_parsed(&mut cfg.ui.sidebar_collapsed_width, &value),
        "ui.user_name" => cfg.ui.user_name = value,
        "feed.max_posts" => set_parsed(&mut cfg.feed.max_posts, &value),
        "feed.card_width" => set_parsed(&mut cfg.feed.card_width, &value),
        "feed.card_gap" => set_parsed(&mut cfg.feed.card_gap, &value),
        "feed.fixture_path" => cfg.feed.fixture_path = Some(PathBuf::from(value)),
        "feed.permalink_base" => cfg.feed.permalink_base = value,
        "card.truncate_threshold" => set_parsed(&mut cfg.card.truncate_threshold, &value),
        "card.tag_cap" => set_parsed(&mut cfg.card.tag_cap, &value),
        "card.collage_height" => set_parsed(&mut cfg.card.collage_height, &value),
        "card.clamp_lines" => set_parsed(&mut cfg.card.clamp_lines, &value),
        "lab.api_key" => cfg.lab.api_key = value,
        "lab.base_url" => cfg.lab.base_url = value,
        "lab.chat_model" => cfg.lab.chat_model = value,
        "lab.image_model" => cfg.lab.image_model = value,
        "lab.search_grounding" => cfg.lab.search_grounding = env_bool(&value),
        "lab.request_timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.lab.request_timeout = duration;
            }
        }
        "lab.download_dir" => cfg.lab.download_dir = Some(PathBuf::from(value)),
        "log.level" => cfg.log.level = value,
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, value: &str) {
    if let Ok(parsed) = value.trim().parse::<T>() {
        *slot = parsed;
    }
}

fn env_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "True")
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("thoth").join("config.yaml"))
}

pub fn to_yaml(cfg: &Config) -> Result<String> {
    let mut redacted = cfg.clone();
    if !redacted.lab.api_key.is_empty() {
        redacted.lab.api_key = "********".into();
    }
    serde_yaml::to_string(&redacted).context("config: failed to serialize config")
}
