// src/config.rs
//! Runtime configuration loaded from `config.yaml`.
//!
//! Every section has defaults, so a missing file or a partial file is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Where the loaded configuration came from; reported once logging is up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    #[default]
    Defaults,
    File(PathBuf),
    Missing(PathBuf),
}

pub const CONFIG_PATH_VAR: &str = "PROFILE_SCORER_CONFIG";
pub const SETTINGS_PATH_VAR: &str = "PROFILE_SCORER_SETTINGS";
pub const API_URL_VAR: &str = "ANTHROPIC_API_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub selectors: SelectorConfig,
    pub expansion: ExpansionConfig,
    pub rubric: RubricConfig,
    pub paths: PathConfig,
    #[serde(skip)]
    pub source: ConfigSource,
    /// Environment variables that replaced configured values.
    #[serde(skip)]
    pub overrides: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
    pub version: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
    /// `None` leaves the transport default in place.
    pub timeout_seconds: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "https://api.anthropic.com/v1/messages".to_string(),
            version: "2023-06-01".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 64000,
            temperature: 0.7,
            stream: false,
            timeout_seconds: None,
        }
    }
}

/// CSS selectors tried in order; the first one that matches wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub name: Vec<String>,
    pub headline: Vec<String>,
    pub about: Vec<String>,
    pub experience_entry: Vec<String>,
    pub job_title: Vec<String>,
    pub company: Vec<String>,
    pub date_range: Vec<String>,
    pub description: Vec<String>,
    pub show_more_control: String,
    pub show_more_label: String,
}

fn owned(selectors: &[&str]) -> Vec<String> {
    selectors.iter().map(|s| s.to_string()).collect()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            name: owned(&[r#"h1[data-anonymize="person-name"]"#]),
            headline: owned(&[
                r#"h1[data-anonymize="headline"]"#,
                r#"[data-anonymize="headline"]"#,
            ]),
            about: owned(&[r#"div[data-anonymize="person-blurb"]"#]),
            experience_entry: owned(&["li._experience-entry_1irc72", r#"li[class*="experience-entry"]"#]),
            job_title: owned(&[r#"h2[data-anonymize="job-title"]"#]),
            company: owned(&[r#"p[data-anonymize="company-name"]"#]),
            date_range: owned(&["span.zZBAOYLmEFjcDfsYUmIEzHtLjzlKDENIg", r#"[data-test="date-range"]"#]),
            description: owned(&[r#"p[data-anonymize="person-blurb"]"#]),
            show_more_control: "button".to_string(),
            show_more_label: "span.button-text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    pub label_text: String,
    pub interval_ms: u64,
    pub buffer_ms: u64,
    pub floor_ms: u64,
    pub settle: SettleStrategy,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            label_text: "Show more".to_string(),
            interval_ms: 500,
            buffer_ms: 2000,
            floor_ms: 3000,
            settle: SettleStrategy::Fixed,
        }
    }
}

impl ExpansionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// `max(count * interval + buffer, floor)`
    pub fn settle_delay(&self, count: usize) -> Duration {
        let scheduled = (count as u64)
            .saturating_mul(self.interval_ms)
            .saturating_add(self.buffer_ms);
        Duration::from_millis(scheduled.max(self.floor_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SettleStrategy {
    Fixed,
    PollUntilStable { poll_ms: u64, timeout_ms: u64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricConfig {
    pub system_prompt_path: Option<PathBuf>,
    pub user_template_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub settings: PathBuf,
    pub log_file: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            settings: PathBuf::from("settings.toml"),
            log_file: std::env::temp_dir().join("profile-scorer.log"),
        }
    }
}

impl AppConfig {
    /// Load `config.yaml` (or the file named by `PROFILE_SCORER_CONFIG`),
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.yaml"));

        let mut config = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            Self {
                source: ConfigSource::Missing(path),
                ..Self::default()
            }
        };

        config.apply_env_overrides();
        config.paths.settings = resolve_path(&config.paths.settings)?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.source = ConfigSource::File(path.to_path_buf());
        Ok(config)
    }

    /// Report where the configuration came from. Loading happens before the
    /// subscriber exists, so this runs after `init_logging`.
    pub fn log_summary(&self) {
        match &self.source {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Missing(path) => {
                warn!("{} not found, using built-in defaults", path.display())
            }
            ConfigSource::Defaults => info!("Using built-in configuration defaults"),
        }
        for name in &self.overrides {
            info!("Configuration overridden by {}", name);
        }
        info!("Scoring endpoint: {} ({})", self.api.url, self.api.model);
        info!("Settings store: {}", self.paths.settings.display());
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_VAR) {
            self.api.url = url;
            self.overrides.push(API_URL_VAR.to_string());
        }
        if let Ok(path) = std::env::var(SETTINGS_PATH_VAR) {
            self.paths.settings = PathBuf::from(path);
            self.overrides.push(SETTINGS_PATH_VAR.to_string());
        }
    }
}

fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(current_dir.join(path))
    }
}
