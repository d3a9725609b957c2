// src/settings.rs
//! Key-value settings owned by the background side.
//!
//! Stored as a small TOML file. The scoring pipeline only ever reads the API
//! key; the other values belong to the settings UI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSettings {
    #[serde(rename = "claudeApiKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(rename = "defaultPrompt", default, skip_serializing_if = "Option::is_none")]
    pub default_prompt: Option<String>,
}

/// Keys accepted by [`SettingsStore::set`].
pub const SETTING_KEYS: [&str; 4] = ["claudeApiKey", "language", "temperature", "defaultPrompt"];

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A store that has never been written reads as empty settings.
    pub async fn load(&self) -> Result<StoredSettings> {
        if !self.path.exists() {
            return Ok(StoredSettings::default());
        }
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read settings: {}", self.path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings: {}", self.path.display()))
    }

    pub async fn save(&self, settings: &StoredSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write settings: {}", self.path.display()))
    }

    /// The configured key, trimmed; `None` when unset or blank.
    pub async fn api_key(&self) -> Result<Option<String>> {
        let settings = self.load().await?;
        Ok(settings
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty()))
    }

    pub async fn set_api_key(&self, api_key: &str) -> Result<()> {
        self.set("claudeApiKey", api_key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let mut settings = self.load().await?;
        match key {
            "claudeApiKey" => {
                if value.is_empty() {
                    anyhow::bail!("API key must not be empty");
                }
                settings.api_key = Some(value.to_string());
            }
            "language" => settings.language = Some(value.to_string()),
            "temperature" => settings.temperature = Some(value.to_string()),
            "defaultPrompt" => settings.default_prompt = Some(value.to_string()),
            other => anyhow::bail!(
                "Unknown setting: {}. Expected one of: {}",
                other,
                SETTING_KEYS.join(", ")
            ),
        }
        self.save(&settings).await?;
        info!("Setting saved: {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.toml"));
        assert_eq!(store.load().await.unwrap(), StoredSettings::default());
        assert_eq!(store.api_key().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_and_read_api_key() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join("settings.toml"));
        store.set_api_key("  sk-test-key  ").await.unwrap();
        store.set("language", "en").await.unwrap();

        assert_eq!(store.api_key().await.unwrap(), Some("sk-test-key".to_string()));
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("claudeApiKey"));
        assert_eq!(store.load().await.unwrap().language.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_rejects_empty_key_and_unknown_setting() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.toml"));
        assert!(store.set_api_key("   ").await.is_err());
        assert!(store.set("theme", "dark").await.is_err());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_blank_stored_key_counts_as_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "claudeApiKey = \"  \"\n").unwrap();
        let store = SettingsStore::new(path);
        assert_eq!(store.api_key().await.unwrap(), None);
    }
}
