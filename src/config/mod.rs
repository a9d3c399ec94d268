use anyhow::{Context, Result};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// YouTube transcript source settings
    #[serde(default)]
    pub youtube: YoutubeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    /// Base URL of the site serving watch pages
    pub base_url: String,

    /// Caption language codes in order of preference
    pub languages: Vec<String>,

    /// Value sent in the Accept-Language header
    pub accept_language: String,

    /// Optional timeout for each HTTP request
    pub request_timeout_secs: Option<u64>,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            languages: vec!["en".to_string()],
            accept_language: "en-US".to_string(),
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults when none exists
    pub fn load() -> Result<Self> {
        match Self::config_path(dirs::config_dir()) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load and validate configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Get the configuration file under the user config directory, if it exists
    fn config_path(config_dir: Option<PathBuf>) -> Option<PathBuf> {
        config_dir
            .map(|dir| dir.join("caption-fetcher").join("config.yaml"))
            .filter(|path| path.is_file())
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        let parsed = Url::parse(&self.youtube.base_url)
            .with_context(|| format!("Invalid base_url in config: {}", self.youtube.base_url))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("base_url must use HTTP or HTTPS protocol");
        }

        HeaderValue::from_str(&self.youtube.accept_language)
            .with_context(|| format!("Invalid accept_language in config: {:?}", self.youtube.accept_language))?;

        if self.youtube.languages.is_empty() {
            anyhow::bail!("At least one caption language must be configured");
        }

        Ok(())
    }
}
