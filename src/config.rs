use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::assistant::openai::DEFAULT_BASE_URL;
use crate::assistant::PollSettings;

pub const DEFAULT_PROMPT: &str = "AI-SYSTEM-001> ";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub assistant_id: Option<String>,
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_key: None,
            assistant_id: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: 1000,
            max_poll_attempts: 50,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    /// Load from `path`, or the default location; a missing file means defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::get_config_path()?,
        };

        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::get_config_path()?,
        };

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        Ok(())
    }

    /// Environment variables take precedence over the file
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(id) = lookup("OPENAI_ASSISTANT_ID") {
            self.assistant_id = Some(id);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.base_url = url;
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
        }
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ai-terminal").join("config.json"))
    }
}
