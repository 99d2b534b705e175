use crate::error::{Error, Result};
use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";

pub const ENV_YOUTUBE_KEY: &str = "YOUTUBE_API_KEY";
pub const ENV_GEMINI_KEY: &str = "GEMINI_API_KEY";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
pub const ENV_PROVIDER: &str = "TRENDPRO_PROVIDER";

/// Regions offered by the dashboard's region selector.
pub const REGIONS: &[&str] = &["ID", "US", "KR", "JP"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub youtube_api_key: Option<String>,
    pub ai: AiConfig,
    pub http: HttpConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    #[value(name = "openai")]
    OpenAI,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::OpenAI => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: Provider,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Exact model names tried in order before falling back to the first listed model.
    pub model_priority: Vec<String>,
    /// OpenAI has no capability listing we rely on; these are the candidates.
    pub openai_models: Vec<String>,
    /// Language the strategy answer is written in.
    pub language: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            gemini_api_key: None,
            openai_api_key: None,
            model_priority: vec![
                "models/gemini-1.5-flash".to_string(),
                "models/gemini-pro".to_string(),
                "models/gemini-1.0-pro".to_string(),
            ],
            openai_models: vec!["gpt-5.2".to_string()],
            language: "English".to_string(),
        }
    }
}

impl AiConfig {
    pub fn api_key(&self) -> Option<&str> {
        match self.provider {
            Provider::Gemini => self.gemini_api_key.as_deref(),
            Provider::OpenAI => self.openai_api_key.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            max_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub region: String,
    pub count: u32,
    /// Check the YouTube key with a one-item request before opening the dashboard.
    pub validate_key: bool,
    pub show_interaction_columns: bool,
    /// Views-per-subscriber ratio at which a video is flagged viral.
    pub viral_threshold: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            region: "ID".to_string(),
            count: 10,
            validate_key: false,
            show_interaction_columns: true,
            viral_threshold: 5.0,
        }
    }
}

impl Config {
    /// Load from an explicit path, or from the platform config dir when present,
    /// then overlay credentials from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => match default_path() {
                Some(path) if path.exists() => Self::read(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|name| std::env::var(name).ok());
        config.sanitize();
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::custom(format!("Cannot read config {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Environment values win over the file; blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_YOUTUBE_KEY) {
            self.youtube_api_key = Some(key);
        }
        if let Some(key) = get(ENV_GEMINI_KEY) {
            self.ai.gemini_api_key = Some(key);
        }
        if let Some(key) = get(ENV_OPENAI_KEY) {
            self.ai.openai_api_key = Some(key);
        }
        if let Some(provider) = get(ENV_PROVIDER) {
            match Provider::from_str(provider.trim(), true) {
                Ok(provider) => self.ai.provider = provider,
                Err(e) => tracing::warn!("ignoring {ENV_PROVIDER}: {e}"),
            }
        }
    }

    fn sanitize(&mut self) {
        self.dashboard.count = clamp_count(self.dashboard.count);
        self.dashboard.region = self.dashboard.region.trim().to_ascii_uppercase();
        if self.dashboard.viral_threshold <= 0.0 {
            self.dashboard.viral_threshold = DashboardConfig::default().viral_threshold;
        }
    }
}

/// Result count accepted by the upstream list calls: 10..=50 in steps of 5.
pub fn clamp_count(count: u32) -> u32 {
    let clamped = count.clamp(10, 50);
    clamped - clamped % 5
}

pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "trendpro").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

pub fn log_dir() -> PathBuf {
    ProjectDirs::from("", "", "trendpro")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("trendpro").join("logs"))
}
