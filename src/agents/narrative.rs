//! Narrative Interpreter
//!
//! Turns the raw user query into a normalized narrative description plus a
//! short display title. One generation call; the title is derived locally.

use crate::config::Config;
use crate::llm::LLM;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};
use tracing::info;

const SYSTEM_INSTRUCTION: &str = "You are an expert in biblical narratives and art history. \
Identify the specific biblical narrative being referenced, the key figures involved, and \
important theological elements that artists might depict.";

/// Maximum title length before falling back to a word-count truncation.
const MAX_TITLE_LEN: usize = 60;
const TITLE_WORD_COUNT: usize = 10;

#[derive(Debug, Clone)]
pub struct NarrativeAnalysis {
    pub description: String,
    pub title: String,
}

pub struct NarrativeAgent;

impl NarrativeAgent {
    /// Interpret the query into a narrative description. An errored or empty
    /// generation is fatal here; there is no fallback for this stage.
    pub async fn interpret(llm: &LLM, config: &Config, query: &str) -> AppResult<NarrativeAnalysis> {
        info!(query = %query, "Interpreting narrative query");

        let request = LLMRequest {
            model: config.llm.model.clone(),
            messages: vec![LLMMessage::user(query)],
            max_tokens: Some(1024),
            temperature: Some(0.7),
            system_instruction: Some(SYSTEM_INSTRUCTION.to_string()),
        };

        let response = llm.create_chat_completion(&request).await?;
        let description = response.content.trim().to_string();
        if description.is_empty() {
            return Err(AppError::LLMApi(
                "Narrative analysis returned no text".to_string(),
            ));
        }

        info!(description_len = description.len(), "Narrative analysis complete");

        Ok(NarrativeAnalysis {
            title: extract_title(&description),
            description,
        })
    }
}

/// Derive a concise title: the first sentence when it fits, otherwise the
/// first ten words with an ellipsis marker.
pub fn extract_title(description: &str) -> String {
    let sentence = first_sentence(description);
    if sentence.len() <= MAX_TITLE_LEN {
        return sentence.to_string();
    }

    let words: Vec<&str> = description
        .split_whitespace()
        .take(TITLE_WORD_COUNT)
        .collect();
    format!("{}...", words.join(" "))
}

/// Text up to the first period that ends a sentence (followed by whitespace
/// or end of input). Without one, the whole text counts as the sentence.
fn first_sentence(text: &str) -> &str {
    for (index, _) in text.match_indices('.') {
        let rest = &text[index + 1..];
        if rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace()) {
            return &text[..index];
        }
    }
    text
}
