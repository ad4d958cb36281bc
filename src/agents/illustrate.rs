//! Illustrator/Annotator
//!
//! For each candidate work: one image search in a browser page of its own,
//! then one generation call for an educational annotation. External lookups
//! and generation are the least reliable part of the system, so every
//! candidate is isolated; a failure degrades that entry to a placeholder
//! image and a canned annotation instead of aborting the batch. One browser
//! session serves the whole batch, with a single page open at any instant.

use crate::browser::{Browser, BrowserSession, PageHandle};
use crate::config::Config;
use crate::llm::LLM;
use crate::models::{AnnotatedWork, CandidateWork};
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};
use tracing::{info, warn};

pub const PLACEHOLDER_IMAGE_URL: &str = "https://placehold.co/600x400?text=Image+Not+Found";

/// Images at or below this footprint are icons and thumbnails, not artwork.
const MIN_IMAGE_DIMENSION: f64 = 100.0;

const ANNOTATION_SYSTEM: &str = "You are an expert in art history and biblical studies. \
Provide insightful, educational annotations for religious artwork.";

pub struct IllustratorAgent;

impl IllustratorAgent {
    /// Annotate every candidate, in order, never dropping one. The returned
    /// list always has the same length as `candidates`.
    pub async fn illustrate(
        browser: &dyn Browser,
        llm: &LLM,
        config: &Config,
        candidates: Vec<CandidateWork>,
        narrative_description: &str,
        original_query: &str,
    ) -> Vec<AnnotatedWork> {
        info!(count = candidates.len(), "Illustrating candidate artworks");

        let mut session = match browser.launch().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Browser session unavailable, degrading entire batch");
                return candidates.into_iter().map(Self::degraded).collect();
            }
        };

        let mut annotated = Vec::with_capacity(candidates.len());
        for work in candidates {
            match Self::illustrate_one(
                session.as_mut(),
                llm,
                config,
                &work,
                narrative_description,
                original_query,
            )
            .await
            {
                Ok(entry) => annotated.push(entry),
                Err(e) => {
                    warn!(error = %e, title = %work.title, "Illustration failed, emitting degraded entry");
                    annotated.push(Self::degraded(work));
                }
            }
        }

        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close browser session");
        }

        annotated
    }

    async fn illustrate_one(
        session: &mut dyn BrowserSession,
        llm: &LLM,
        config: &Config,
        work: &CandidateWork,
        narrative_description: &str,
        original_query: &str,
    ) -> AppResult<AnnotatedWork> {
        let image_url = Self::find_image(session, work).await?;
        let annotation =
            Self::annotate(llm, config, work, narrative_description, original_query).await?;

        Ok(AnnotatedWork {
            work: work.clone(),
            image_url: image_url.unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
            annotation,
        })
    }

    async fn find_image(
        session: &mut dyn BrowserSession,
        work: &CandidateWork,
    ) -> AppResult<Option<String>> {
        let mut page = session.open_page().await?;
        let result = Self::scan_page(page.as_mut(), work).await;
        // The page is scoped to this one candidate; close it before judging
        // the scan so an error cannot leave the window open.
        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close search page");
        }
        result
    }

    async fn scan_page(
        page: &mut dyn PageHandle,
        work: &CandidateWork,
    ) -> AppResult<Option<String>> {
        page.navigate(&Self::search_url(work)?).await?;
        let images = page.images().await?;

        let mut filtered = images
            .into_iter()
            .filter(|img| img.width > MIN_IMAGE_DIMENSION && img.height > MIN_IMAGE_DIMENSION);

        // The first filtered hit is routinely the search provider's own logo;
        // taking the second slot is a provider-specific heuristic, nothing more.
        Ok(filtered.nth(1).map(|img| img.src))
    }

    fn search_url(work: &CandidateWork) -> AppResult<String> {
        let query = format!("{} {} painting biblical art", work.title, work.artist);
        let url = reqwest::Url::parse_with_params(
            "https://www.google.com/search",
            &[("q", query.as_str()), ("tbm", "isch")],
        )
        .map_err(|e| AppError::Internal(format!("Failed to build search URL: {e}")))?;
        Ok(url.to_string())
    }

    async fn annotate(
        llm: &LLM,
        config: &Config,
        work: &CandidateWork,
        narrative_description: &str,
        original_query: &str,
    ) -> AppResult<String> {
        let request = LLMRequest {
            model: config.llm.model.clone(),
            messages: vec![LLMMessage::user(Self::annotation_prompt(
                work,
                narrative_description,
                original_query,
            ))],
            max_tokens: Some(config.pipeline.annotation_max_tokens),
            temperature: Some(0.7),
            system_instruction: Some(ANNOTATION_SYSTEM.to_string()),
        };

        let response = llm.create_chat_completion(&request).await?;
        let annotation = response.content.trim().to_string();
        if annotation.is_empty() {
            return Err(AppError::LLMApi(
                "Annotation generation returned no text".to_string(),
            ));
        }
        Ok(annotation)
    }

    fn annotation_prompt(
        work: &CandidateWork,
        narrative_description: &str,
        original_query: &str,
    ) -> String {
        format!(
            r#"Artwork: "{title}" by {artist} ({year}, {era})

Biblical Narrative: {narrative_description}

Original Query: {original_query}

Provide an educational annotation for this artwork that:
1. Explains how it depicts the biblical narrative
2. Highlights artistic choices and symbolism
3. Places it in historical and theological context
4. Notes how it reflects the artistic style of its era ({era})

Keep your annotation concise (about 150 words) and accessible to a general audience."#,
            title = work.title,
            artist = work.artist,
            year = work.year,
            era = work.era,
        )
    }

    /// Deterministic stand-in built purely from the candidate's own fields.
    fn degraded(work: CandidateWork) -> AnnotatedWork {
        let annotation = Self::fallback_annotation(&work);
        AnnotatedWork {
            work,
            image_url: PLACEHOLDER_IMAGE_URL.to_string(),
            annotation,
        }
    }

    pub fn fallback_annotation(work: &CandidateWork) -> String {
        format!(
            "We couldn't retrieve information for this artwork. The piece \"{}\" by {} ({}) \
             is a notable depiction of this biblical narrative from the {} period.",
            work.title, work.artist, work.year, work.era
        )
    }
}
