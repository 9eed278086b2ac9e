use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Word counts a test can be configured with.
pub const WORD_COUNT_PRESETS: [usize; 3] = [10, 15, 20];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_word_count")]
    pub word_count: usize,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub guest_name: String,
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,
    #[serde(default = "default_min_save_accuracy")]
    pub min_save_accuracy: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_word_count() -> usize {
    WORD_COUNT_PRESETS[0]
}
fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_inactivity_timeout_secs() -> u64 {
    30
}
fn default_min_save_accuracy() -> u32 {
    70
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_theme() -> String {
    "default".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            word_count: default_word_count(),
            api_base_url: default_api_base_url(),
            access_token: None,
            guest_name: String::new(),
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            min_save_accuracy: default_min_save_accuracy(),
            request_timeout_secs: default_request_timeout_secs(),
            theme: default_theme(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("swiftype")
            .join("config.toml")
    }

    /// Clamp loaded values into their supported ranges.
    pub fn validate(&mut self) {
        self.word_count = nearest_preset(self.word_count);
        self.min_save_accuracy = self.min_save_accuracy.min(100);
        self.inactivity_timeout_secs = self.inactivity_timeout_secs.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        if self.api_base_url.trim().is_empty() {
            self.api_base_url = default_api_base_url();
        }
        if self
            .access_token
            .as_deref()
            .is_some_and(|t| t.trim().is_empty())
        {
            self.access_token = None;
        }
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn nearest_preset(word_count: usize) -> usize {
    WORD_COUNT_PRESETS
        .iter()
        .copied()
        .min_by_key(|&preset| preset.abs_diff(word_count))
        .unwrap_or_else(default_word_count)
}
