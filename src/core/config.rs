use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_MODULE: &str = "hitokoto";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u32 = 900;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffPolicy {
    Linear,
    #[default]
    Exponential,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackoffConfig {
    #[serde(default)]
    pub policy: BackoffPolicy,
    #[serde(default = "default_backoff_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_backoff_max_delay_secs")]
    pub max_delay_secs: u64,
}

fn default_backoff_initial_delay_ms() -> u64 {
    2_000
}

fn default_backoff_max_delay_secs() -> u64 {
    5 * 60 * 60
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig {
            policy: BackoffPolicy::default(),
            initial_delay_ms: default_backoff_initial_delay_ms(),
            max_delay_secs: default_backoff_max_delay_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_interval")]
    pub interval_secs: u32,
    /// Takes precedence over `interval_secs` when set to a non-zero value.
    #[serde(default)]
    pub interval_override_secs: Option<u32>,
    #[serde(default)]
    pub unmetered_only: bool,
    #[serde(default)]
    pub backoff: BackoffConfig,
}

fn default_refresh_interval() -> u32 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            interval_secs: default_refresh_interval(),
            interval_override_secs: None,
            unmetered_only: false,
            backoff: BackoffConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NetworkConfig {
    #[serde(default = "default_probe_url")]
    pub probe_url: String,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Treat the current connection as metered.
    #[serde(default)]
    pub metered: bool,
}

fn default_probe_url() -> String {
    "https://www.gstatic.com/generate_204".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    3_000
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            probe_url: default_probe_url(),
            probe_timeout_ms: default_probe_timeout_ms(),
            metered: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HitokotoProviderConfig {
    pub base_url: String,
    #[serde(default = "default_hitokoto_types")]
    pub types: Vec<String>,
}

fn default_hitokoto_types() -> Vec<String> {
    vec!["a".to_string()]
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WikiquoteProviderConfig {
    #[serde(default = "default_wikiquote_language")]
    pub language: String,
    /// Overrides the main page of the selected language.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_wikiquote_language() -> String {
    "English".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BaseUrlProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BrainyQuoteProviderConfig {
    pub base_url: String,
    #[serde(default = "default_brainy_type")]
    pub feed_type: String,
}

fn default_brainy_type() -> String {
    "BR".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FortuneProviderConfig {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_fortune_max_length")]
    pub max_length: usize,
}

fn default_fortune_max_length() -> usize {
    160
}

impl Default for FortuneProviderConfig {
    fn default() -> Self {
        FortuneProviderConfig {
            category: None,
            max_length: default_fortune_max_length(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAiProviderConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_wikiquote_language")]
    pub language: String,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

impl Default for OpenAiProviderConfig {
    fn default() -> Self {
        OpenAiProviderConfig {
            base_url: default_openai_base_url(),
            api_key: None,
            model: default_openai_model(),
            language: default_wikiquote_language(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub hitokoto: Option<HitokotoProviderConfig>,
    pub wikiquote: Option<WikiquoteProviderConfig>,
    pub jinrishici: Option<BaseUrlProviderConfig>,
    pub freakuotes: Option<BaseUrlProviderConfig>,
    pub natune: Option<BaseUrlProviderConfig>,
    pub brainyquote: Option<BrainyQuoteProviderConfig>,
    pub libquotes: Option<BaseUrlProviderConfig>,
    pub fortune: Option<FortuneProviderConfig>,
    pub openai: Option<OpenAiProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            hitokoto: Some(HitokotoProviderConfig {
                base_url: "https://v1.hitokoto.cn".to_string(),
                types: default_hitokoto_types(),
            }),
            wikiquote: Some(WikiquoteProviderConfig {
                language: default_wikiquote_language(),
                base_url: None,
            }),
            jinrishici: Some(BaseUrlProviderConfig {
                base_url: "https://v2.jinrishici.com".to_string(),
            }),
            freakuotes: Some(BaseUrlProviderConfig {
                base_url: "https://freakuotes.com".to_string(),
            }),
            natune: Some(BaseUrlProviderConfig {
                base_url: "https://natune.net".to_string(),
            }),
            brainyquote: Some(BrainyQuoteProviderConfig {
                base_url: "https://feeds.feedburner.com".to_string(),
                feed_type: default_brainy_type(),
            }),
            libquotes: Some(BaseUrlProviderConfig {
                base_url: "https://feeds.feedburner.com".to_string(),
            }),
            fortune: Some(FortuneProviderConfig::default()),
            openai: Some(OpenAiProviderConfig::default()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Identifier of the active quote module.
    #[serde(default = "default_module")]
    pub module: String,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
}

fn default_module() -> String {
    DEFAULT_MODULE.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            module: default_module(),
            refresh: RefreshConfig::default(),
            network: NetworkConfig::default(),
            providers: ProvidersConfig::default(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "quotelock", "quotelock")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "quotelock", "quotelock")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
