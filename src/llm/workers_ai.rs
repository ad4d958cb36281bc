// Cloudflare Workers AI adapter
// Runs hosted models (Llama 3 class) through the account-scoped REST API.
// API Reference: https://developers.cloudflare.com/api/operations/workers-ai-post-run-model

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest, LLMResponse, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const WORKERS_AI_API_BASE: &str = "https://api.cloudflare.com/client/v4/accounts";

pub struct WorkersAiAdapter {
    client: Client,
    account_id: String,
    api_token: String,
}

#[derive(Serialize)]
struct WorkersAiRunRequest {
    messages: Vec<WorkersAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct WorkersAiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct WorkersAiRunResponse {
    success: bool,
    #[serde(default)]
    result: Option<WorkersAiResult>,
    #[serde(default)]
    errors: Vec<WorkersAiError>,
}

#[derive(Deserialize)]
struct WorkersAiResult {
    #[serde(default)]
    response: String,
    #[serde(default)]
    usage: Option<WorkersAiUsage>,
}

#[derive(Deserialize)]
struct WorkersAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct WorkersAiError {
    #[serde(default)]
    code: i64,
    message: String,
}

impl WorkersAiAdapter {
    pub fn new(account_id: &str, api_token: &str) -> Self {
        Self {
            client: Client::new(),
            account_id: account_id.to_string(),
            api_token: api_token.to_string(),
        }
    }

    fn run_url(&self, model: &str) -> String {
        format!(
            "{}/{}/ai/run/{}",
            WORKERS_AI_API_BASE, self.account_id, model
        )
    }

    fn build_messages(request: &LLMRequest) -> Vec<WorkersAiMessage> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system_instruction {
            messages.push(WorkersAiMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|m: &LLMMessage| {
            WorkersAiMessage {
                role: m.role.clone(),
                content: m.content.clone(),
            }
        }));
        messages
    }
}

#[async_trait]
impl LLMAdapter for WorkersAiAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let body = WorkersAiRunRequest {
            messages: Self::build_messages(request),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(self.run_url(&request.model))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("Workers AI request failed: {e}")))?;

        let status = response.status();
        let parsed: WorkersAiRunResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Workers AI response decode failed: {e}")))?;

        if !status.is_success() || !parsed.success {
            let detail = parsed
                .errors
                .first()
                .map(|e| format!("{} (code {})", e.message, e.code))
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(AppError::LLMApi(format!("Workers AI error: {detail}")));
        }

        let result = parsed
            .result
            .ok_or_else(|| AppError::LLMApi("Workers AI returned no result".to_string()))?;

        let usage = result
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(LLMResponse {
            content: result.response,
            finish_reason: "stop".to_string(),
            usage,
        })
    }
}
