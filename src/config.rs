use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub browser: BrowserConfig,
    pub pipeline: PipelineConfig,
    pub stats: StatsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    /// "workers-ai" or "openai"
    pub provider: String,
    pub model: String,
    pub cloudflare_account_id: String,
    pub cloudflare_api_token: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// Base URL of a W3C WebDriver endpoint (chromedriver, geckodriver, selenium).
    pub webdriver_url: String,
    /// Implicit element-wait timeout applied to every session. Bounds how long
    /// an image search page may stall before the batch moves on.
    pub implicit_wait_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Target number of candidate works requested from the enumerator.
    pub artwork_count: usize,
    pub annotation_max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Override for the stats file directory. Defaults to an XDG-style path.
    pub data_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            llm: LLMConfig {
                provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "workers-ai".to_string()),
                model: env::var("LLM_MODEL")
                    .unwrap_or_else(|_| "@cf/meta/llama-3-8b-instruct".to_string()),
                cloudflare_account_id: env::var("CLOUDFLARE_ACCOUNT_ID").unwrap_or_default(),
                cloudflare_api_token: env::var("CLOUDFLARE_API_TOKEN").unwrap_or_default(),
                openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                openai_base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            },
            browser: BrowserConfig {
                webdriver_url: env::var("WEBDRIVER_URL")
                    .unwrap_or_else(|_| "http://localhost:9515".to_string()),
                implicit_wait_ms: env::var("BROWSER_IMPLICIT_WAIT_MS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()?,
            },
            pipeline: PipelineConfig {
                artwork_count: env::var("ARTWORK_COUNT")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                annotation_max_tokens: env::var("ANNOTATION_MAX_TOKENS")
                    .unwrap_or_else(|_| "512".to_string())
                    .parse()?,
            },
            stats: StatsConfig {
                data_dir: env::var("STATS_DATA_DIR").ok(),
            },
        })
    }
}
