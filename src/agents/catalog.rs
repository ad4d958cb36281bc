//! Candidate Enumerator
//!
//! Asks the model for a period-diverse list of artworks depicting the
//! interpreted narrative. The response is requested as JSON but never trusted
//! to be well-formed; this agent only produces the raw text, and the result
//! parser in `extract` owns turning it into records.

use crate::config::Config;
use crate::llm::LLM;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};
use tracing::info;

pub struct CatalogAgent;

impl CatalogAgent {
    pub async fn enumerate(
        llm: &LLM,
        config: &Config,
        narrative_description: &str,
    ) -> AppResult<String> {
        let target_count = config.pipeline.artwork_count;
        info!(target_count, "Enumerating candidate artworks");

        let request = LLMRequest {
            model: config.llm.model.clone(),
            messages: vec![LLMMessage::user(format!(
                "Generate a list of significant artworks depicting the following biblical narrative: {narrative_description}"
            ))],
            max_tokens: Some(2048),
            // Lower temperature keeps the output closer to the requested shape.
            temperature: Some(0.3),
            system_instruction: Some(Self::system_instruction(target_count)),
        };

        let response = llm.create_chat_completion(&request).await?;
        let raw = response.content;
        if raw.trim().is_empty() {
            return Err(AppError::LLMApi(
                "Artwork enumeration returned no text".to_string(),
            ));
        }

        info!(response_len = raw.len(), "Candidate enumeration complete");
        Ok(raw)
    }

    fn system_instruction(target_count: usize) -> String {
        format!(
            r#"You are an art history expert specializing in religious art.
Generate a list of {target_count} significant artworks depicting biblical narratives from different historical periods.
For each artwork include:
1. Title
2. Artist
3. Year created (approximate if necessary)
4. Art historical period/era (e.g., Renaissance, Baroque, etc.)

Ensure you include a diverse range of historical periods and artistic styles.
Format your response as valid JSON with this structure:
[
  {{
    "title": "Title of Artwork",
    "artist": "Artist Name",
    "year": "Year or Year Range",
    "era": "Art Historical Period"
  }}
]"#
        )
    }
}
