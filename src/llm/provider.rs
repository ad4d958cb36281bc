use crate::config::LLMConfig;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse};
use async_trait::async_trait;

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    provider_name: String,
}

impl LLM {
    pub fn from_config(config: &LLMConfig) -> AppResult<Self> {
        let adapter: Box<dyn LLMAdapter> = match config.provider.as_str() {
            "workers-ai" => Box::new(crate::llm::workers_ai::WorkersAiAdapter::new(
                &config.cloudflare_account_id,
                &config.cloudflare_api_token,
            )),
            "openai" => Box::new(crate::llm::openai::OpenAIAdapter::new(
                &config.openai_api_key,
                &config.openai_base_url,
            )),
            other => {
                return Err(AppError::Internal(format!(
                    "Unsupported LLM provider: {other}"
                )));
            }
        };

        Ok(Self {
            adapter,
            provider_name: config.provider.clone(),
        })
    }

    /// Wrap an arbitrary adapter. Used by tests to inject mock generators.
    pub fn with_adapter(adapter: Box<dyn LLMAdapter>, provider_name: impl Into<String>) -> Self {
        Self {
            adapter,
            provider_name: provider_name.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }
}
