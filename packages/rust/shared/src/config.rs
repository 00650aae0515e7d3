//! Application configuration for BrandScout.
//!
//! User config lives at `~/.brandscout/brandscout.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are never stored in the file: the config names the env vars
//! that hold them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BrandScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "brandscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".brandscout";

/// Desktop browser UA; many small-business sites refuse obvious bot agents.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128 Safari/537.36";

// ---------------------------------------------------------------------------
// Provider selection
// ---------------------------------------------------------------------------

/// Which enrichment strategy to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Keyless DuckDuckGo HTML search + heuristic selection.
    #[default]
    Ddg,
    /// SerpAPI search + heuristic selection.
    Serpapi,
    /// Single-shot language model.
    Openai,
    /// Search candidates arbitrated by a language model.
    Hybrid,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ddg => "ddg",
            Self::Serpapi => "serpapi",
            Self::Openai => "openai",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = BrandScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ddg" | "duckduckgo" => Ok(Self::Ddg),
            "serpapi" => Ok(Self::Serpapi),
            "openai" | "llm" => Ok(Self::Openai),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(BrandScoutError::config(format!(
                "unknown search provider '{other}': expected ddg, serpapi, openai, or hybrid"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Config structs (matching brandscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Outbound HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Search backend settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Language-model settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path to the catalog JSON document.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Public web root; logos land in `<public_dir>/images/logos/`.
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    /// Name of the record collection inside the catalog document.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Locality hint appended to search queries (e.g. "San Diego").
    #[serde(default)]
    pub locality: String,

    /// Enrichment provider used when enrichment is requested.
    #[serde(default)]
    pub provider: ProviderKind,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            public_dir: default_public_dir(),
            collection: default_collection(),
            locality: String::new(),
            provider: ProviderKind::default(),
        }
    }
}

fn default_catalog_path() -> String {
    "app/content/site.json".into()
}
fn default_public_dir() -> String {
    "public".into()
}
fn default_collection() -> String {
    "sponsors".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Overall timeout for every outbound request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum homepage bytes read by the markup scanner.
    #[serde(default = "default_max_page_bytes")]
    pub max_page_bytes: u64,

    /// Maximum image bytes written by the logo fetcher.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_page_bytes: default_max_page_bytes(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_max_page_bytes() -> u64 {
    2 * 1024 * 1024
}
fn default_max_image_bytes() -> u64 {
    50 * 1024 * 1024
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// DuckDuckGo HTML endpoint root.
    #[serde(default = "default_duckduckgo_base_url")]
    pub duckduckgo_base_url: String,

    /// SerpAPI endpoint root.
    #[serde(default = "default_serpapi_base_url")]
    pub serpapi_base_url: String,

    /// Name of the env var holding the SerpAPI key.
    #[serde(default = "default_serpapi_key_env")]
    pub serpapi_key_env: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            duckduckgo_base_url: default_duckduckgo_base_url(),
            serpapi_base_url: default_serpapi_base_url(),
            serpapi_key_env: default_serpapi_key_env(),
        }
    }
}

fn default_duckduckgo_base_url() -> String {
    "https://html.duckduckgo.com".into()
}
fn default_serpapi_base_url() -> String {
    "https://serpapi.com".into()
}
fn default_serpapi_key_env() -> String {
    "SERPAPI_KEY".into()
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API root (`/chat/completions` is appended).
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model ID.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_model(),
            api_key_env: default_llm_key_env(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_llm_key_env() -> String {
    "OPENAI_API_KEY".into()
}

// ---------------------------------------------------------------------------
// Enrichment config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime enrichment configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Provider to use when enrichment is explicitly requested.
    pub provider: ProviderKind,
    /// Locality hint for search queries and prompts.
    pub locality: String,
    /// SerpAPI key, if any.
    pub serpapi_key: Option<String>,
    /// Language-model key, if any.
    pub llm_key: Option<String>,
    pub duckduckgo_base_url: String,
    pub serpapi_base_url: String,
    pub llm_base_url: String,
    pub llm_model: String,
}

impl From<&AppConfig> for EnrichConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            provider: config.defaults.provider,
            locality: config.defaults.locality.clone(),
            serpapi_key: resolve_secret(None, &config.search.serpapi_key_env),
            llm_key: resolve_secret(None, &config.llm.api_key_env),
            duckduckgo_base_url: config.search.duckduckgo_base_url.clone(),
            serpapi_base_url: config.search.serpapi_base_url.clone(),
            llm_base_url: config.llm.base_url.clone(),
            llm_model: config.llm.model.clone(),
        }
    }
}

/// Pick a secret: explicit value first, then the named env var.
/// Blank values count as absent.
pub fn resolve_secret(explicit: Option<&str>, env_var: &str) -> Option<String> {
    if let Some(v) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(v.to_string());
    }
    std::env::var(env_var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.brandscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BrandScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.brandscout/brandscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BrandScoutError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BrandScoutError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BrandScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BrandScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BrandScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
