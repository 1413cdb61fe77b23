use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use lazy_static::lazy_static;

const CONFIG_FILE_NAME: &str = "completion.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("API key variable {0} is not set")]
    MissingApiKey(String),
}

/// Settings for the chat completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the bearer token
    pub api_key_env: String,
    pub referer: Option<String>,
    pub title: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig {
            endpoint: "https://api.deepseek.com/chat/completions".to_string(),
            model: "deepseek-chat".to_string(),
            system_prompt: "You are a helpful AI assistant.".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            top_p: 0.9,
            timeout_secs: 60,
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            referer: Some("https://nimc-bot.vercel.app/".to_string()),
            title: Some("HR AI Assistant".to_string()),
        }
    }
}

impl CompletionConfig {
    /// Load from an explicit path. Errors are returned, not swallowed.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read the API key from the configured variable, loading `.env` first
    pub fn api_key(&self) -> Result<String, ConfigError> {
        dotenvy::dotenv().ok();
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey(self.api_key_env.clone())),
        }
    }
}

fn get_config_path() -> PathBuf {
    // Use platform-specific app data directory
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let mut dir = PathBuf::from(home);
            dir.push("Library/Application Support/replyclean");
            dir.push(CONFIG_FILE_NAME);
            return dir;
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            let mut dir = PathBuf::from(appdata);
            dir.push("replyclean");
            dir.push(CONFIG_FILE_NAME);
            return dir;
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let mut dir = PathBuf::from(home);
            dir.push(".local/share/replyclean");
            dir.push(CONFIG_FILE_NAME);
            return dir;
        }
    }

    // Fallback
    PathBuf::from(CONFIG_FILE_NAME)
}

fn load_completion_config_internal() -> CompletionConfig {
    let config_path = get_config_path();

    if !config_path.exists() {
        tracing::debug!(path = ?config_path, "No completion config file, using defaults");
        return CompletionConfig::default();
    }

    match CompletionConfig::from_path(&config_path) {
        Ok(config) => {
            tracing::info!(path = ?config_path, "Loaded completion config");
            config
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load completion config, using defaults");
            CompletionConfig::default()
        }
    }
}

lazy_static! {
    static ref COMPLETION_CONFIG: CompletionConfig = load_completion_config_internal();
}

/// Get the cached completion configuration (loaded once per process)
pub fn get_completion_config() -> &'static CompletionConfig {
    &COMPLETION_CONFIG
}
