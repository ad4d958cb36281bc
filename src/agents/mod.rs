//! Agent Pipeline
//!
//! The staged pipeline behind every artwork survey query:
//!
//! ```text
//! Query
//!   │
//!   ▼
//! Narrative Interpreter ──► narrative description + title
//!   │
//!   ▼
//! Candidate Enumerator ──► raw model output (JSON-ish)
//!   │
//!   ▼
//! Result Parser ──► candidate works (structured or heuristic)
//!   │
//!   ▼
//! Illustrator/Annotator ──► one annotated work per candidate
//!   │
//!   ▼
//! Era grouping ──► QueryResult
//! ```
//!
//! Interpreter and enumerator failures are fatal to the request; everything
//! downstream degrades instead of failing.

pub mod catalog;
pub mod extract;
pub mod illustrate;
pub mod narrative;

pub use catalog::CatalogAgent;
pub use extract::{parse_works, HeuristicExtractor, ParsedWorks};
pub use illustrate::{IllustratorAgent, PLACEHOLDER_IMAGE_URL};
pub use narrative::{extract_title, NarrativeAgent, NarrativeAnalysis};

use crate::models::{AnnotatedWork, AppState, ArtworkGroups, EraGroups, QueryResult};
use crate::types::AppResult;
use tracing::{debug, info, warn};

/// Run the full survey pipeline for one query.
pub async fn process_query(state: &AppState, query: &str) -> AppResult<QueryResult> {
    info!(query = %query, "Starting artwork survey pipeline");

    let narrative = NarrativeAgent::interpret(&state.llm, &state.config, query).await?;

    let raw = CatalogAgent::enumerate(&state.llm, &state.config, &narrative.description).await?;

    let candidates = match parse_works(&raw) {
        ParsedWorks::Structured(works) => {
            debug!(count = works.len(), "Parsed structured artwork list");
            works
        }
        ParsedWorks::Heuristic(works) => {
            warn!(
                count = works.len(),
                "Structured parse failed, extracted artworks heuristically"
            );
            works
        }
    };

    let annotated = IllustratorAgent::illustrate(
        state.browser.as_ref(),
        &state.llm,
        &state.config,
        candidates,
        &narrative.description,
        query,
    )
    .await;

    let by_era = group_by_era(&annotated);
    info!(
        artworks = annotated.len(),
        eras = by_era.len(),
        "Artwork survey pipeline complete"
    );

    Ok(QueryResult {
        query: query.to_string(),
        narrative: narrative.title,
        narrative_description: narrative.description,
        artworks: ArtworkGroups {
            all: annotated,
            by_era,
        },
    })
}

/// Group works by their literal era string, `"Unknown"` for empty ones.
/// Groups appear in first-seen order; works keep their input order.
pub fn group_by_era(works: &[AnnotatedWork]) -> EraGroups {
    let mut groups = EraGroups::default();
    for work in works {
        let era = if work.work.era.is_empty() {
            "Unknown".to_string()
        } else {
            work.work.era.clone()
        };
        groups.push(era, work.clone());
    }
    groups
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::browser::{Browser, BrowserSession, ImageElement, PageHandle};
    use crate::config::{
        BrowserConfig, Config, LLMConfig, PipelineConfig, ServerConfig, StatsConfig,
    };
    use crate::llm::{LLMAdapter, LLM};
    use crate::models::CandidateWork;
    use crate::stats::StatsTracker;
    use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    pub(crate) fn test_config() -> Config {
        Config {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
                cors_allowed_origins: vec![],
            },
            llm: LLMConfig {
                provider: "mock".to_string(),
                model: "mock-model".to_string(),
                cloudflare_account_id: String::new(),
                cloudflare_api_token: String::new(),
                openai_api_key: String::new(),
                openai_base_url: String::new(),
            },
            browser: BrowserConfig {
                webdriver_url: "http://localhost:9515".to_string(),
                implicit_wait_ms: 1000,
            },
            pipeline: PipelineConfig {
                artwork_count: 10,
                annotation_max_tokens: 512,
            },
            stats: StatsConfig { data_dir: None },
        }
    }

    // ── Scripted LLM adapter ──────────────────────────────────────────────

    pub(crate) enum Reply {
        Text(String),
        Fail(String),
        Hang,
    }

    /// Replays a fixed script of responses, one per generation call.
    pub(crate) struct ScriptedAdapter {
        replies: Mutex<VecDeque<Reply>>,
    }

    impl ScriptedAdapter {
        pub(crate) fn new(script: Vec<Result<String, String>>) -> Self {
            Self::with_script(
                script
                    .into_iter()
                    .map(|entry| match entry {
                        Ok(text) => Reply::Text(text),
                        Err(message) => Reply::Fail(message),
                    })
                    .collect(),
            )
        }

        pub(crate) fn with_script(script: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(script.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl LLMAdapter for ScriptedAdapter {
        async fn create_chat_completion(&self, _request: &LLMRequest) -> AppResult<LLMResponse> {
            let reply = self
                .replies
                .lock()
                .expect("script lock")
                .pop_front()
                .expect("unexpected extra LLM call");
            match reply {
                Reply::Text(content) => Ok(LLMResponse {
                    content,
                    finish_reason: "stop".to_string(),
                    usage: TokenUsage::default(),
                }),
                Reply::Fail(message) => Err(AppError::LLMApi(message)),
                Reply::Hang => std::future::pending().await,
            }
        }
    }

    // ── Mock browser ──────────────────────────────────────────────────────

    #[derive(Default)]
    pub(crate) struct MockCounters {
        pub(crate) pages_opened: AtomicUsize,
        pub(crate) pages_closed: AtomicUsize,
        pub(crate) sessions_released: AtomicUsize,
    }

    pub(crate) struct MockBrowser {
        images: Vec<Vec<ImageElement>>,
        fail_open_page_at: Option<usize>,
        fail_launch: bool,
        counters: Arc<MockCounters>,
    }

    impl MockBrowser {
        pub(crate) fn new(images: Vec<Vec<ImageElement>>) -> Self {
            Self {
                images,
                fail_open_page_at: None,
                fail_launch: false,
                counters: Arc::new(MockCounters::default()),
            }
        }

        /// Refuse the nth `open_page` call (1-based).
        pub(crate) fn fail_open_page_at(mut self, n: usize) -> Self {
            self.fail_open_page_at = Some(n);
            self
        }

        pub(crate) fn fail_launch(mut self) -> Self {
            self.fail_launch = true;
            self
        }

        pub(crate) fn counters(&self) -> Arc<MockCounters> {
            self.counters.clone()
        }
    }

    #[async_trait]
    impl Browser for MockBrowser {
        async fn launch(&self) -> AppResult<Box<dyn BrowserSession>> {
            if self.fail_launch {
                return Err(AppError::Browser("browser unavailable".to_string()));
            }
            Ok(Box::new(MockSession {
                images: self.images.clone(),
                fail_open_page_at: self.fail_open_page_at,
                counters: self.counters.clone(),
                released: false,
            }))
        }
    }

    struct MockSession {
        images: Vec<Vec<ImageElement>>,
        fail_open_page_at: Option<usize>,
        counters: Arc<MockCounters>,
        released: bool,
    }

    #[async_trait]
    impl BrowserSession for MockSession {
        async fn open_page(&mut self) -> AppResult<Box<dyn PageHandle>> {
            let n = self.counters.pages_opened.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_open_page_at == Some(n) {
                return Err(AppError::Browser("page open refused".to_string()));
            }
            let images = self
                .images
                .get(n - 1)
                .or_else(|| self.images.last())
                .cloned()
                .unwrap_or_default();
            Ok(Box::new(MockPage {
                images,
                counters: self.counters.clone(),
                closed: false,
            }))
        }

        async fn close(self: Box<Self>) -> AppResult<()> {
            let mut this = self;
            this.released = true;
            this.counters.sessions_released.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Drop for MockSession {
        fn drop(&mut self) {
            if !self.released {
                self.counters.sessions_released.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    struct MockPage {
        images: Vec<ImageElement>,
        counters: Arc<MockCounters>,
        closed: bool,
    }

    #[async_trait]
    impl PageHandle for MockPage {
        async fn navigate(&mut self, _url: &str) -> AppResult<()> {
            Ok(())
        }

        async fn images(&mut self) -> AppResult<Vec<ImageElement>> {
            Ok(self.images.clone())
        }

        async fn close(self: Box<Self>) -> AppResult<()> {
            let mut this = self;
            this.closed = true;
            this.counters.pages_closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Drop for MockPage {
        fn drop(&mut self) {
            if !self.closed {
                self.counters.pages_closed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    pub(crate) fn test_state(llm: LLM, browser: Arc<dyn Browser>) -> AppState {
        AppState {
            config: test_config(),
            llm: Arc::new(llm),
            browser,
            stats: StatsTracker::new(),
        }
    }

    // ── Grouping ──────────────────────────────────────────────────────────

    fn annotated(title: &str, era: &str) -> AnnotatedWork {
        AnnotatedWork {
            work: CandidateWork {
                title: title.to_string(),
                artist: "Artist".to_string(),
                year: "1500".to_string(),
                era: era.to_string(),
            },
            image_url: "https://cdn.example/a.jpg".to_string(),
            annotation: "Annotation.".to_string(),
        }
    }

    #[test]
    fn test_group_by_era_first_seen_order_and_unknown_bucket() {
        let works = vec![
            annotated("A", "Baroque"),
            annotated("B", "Renaissance"),
            annotated("C", ""),
            annotated("D", "Baroque"),
        ];

        let groups = group_by_era(&works);
        let order: Vec<&str> = groups.iter().map(|(era, _)| era).collect();
        assert_eq!(order, vec!["Baroque", "Renaissance", "Unknown"]);
        assert_eq!(groups.get("Baroque").unwrap().len(), 2);
        assert_eq!(groups.get("Baroque").unwrap()[0].work.title, "A");
        assert_eq!(groups.get("Baroque").unwrap()[1].work.title, "D");
        assert_eq!(groups.get("Unknown").unwrap()[0].work.title, "C");
    }

    #[test]
    fn test_grouping_law_every_work_in_exactly_one_bucket() {
        let works = vec![
            annotated("A", "Baroque"),
            annotated("B", "baroque"), // case-sensitive, separate bucket
            annotated("C", "Gothic"),
            annotated("D", ""),
        ];

        let groups = group_by_era(&works);
        let total: usize = groups.iter().map(|(_, group)| group.len()).sum();
        assert_eq!(total, works.len());
        assert_eq!(groups.len(), 4);
    }

    #[test]
    fn test_era_groups_serialize_in_insertion_order() {
        let works = vec![
            annotated("A", "Romantic"),
            annotated("B", "Byzantine"),
            annotated("C", "Romantic"),
        ];

        let json = serde_json::to_string(&group_by_era(&works)).unwrap();
        let romantic = json.find("\"Romantic\"").unwrap();
        let byzantine = json.find("\"Byzantine\"").unwrap();
        assert!(romantic < byzantine);
    }

    // ── End-to-end pipeline ───────────────────────────────────────────────

    fn last_supper_images() -> Vec<ImageElement> {
        vec![
            ImageElement {
                src: "https://cdn.example/logo.png".to_string(),
                width: 90.0,
                height: 30.0,
            },
            ImageElement {
                src: "https://cdn.example/shot-1.jpg".to_string(),
                width: 640.0,
                height: 480.0,
            },
            ImageElement {
                src: "https://cdn.example/shot-2.jpg".to_string(),
                width: 800.0,
                height: 600.0,
            },
        ]
    }

    #[tokio::test]
    async fn test_end_to_end_survey_with_one_failing_candidate() {
        let enumeration = r#"[
            {"title": "The Last Supper", "artist": "Leonardo da Vinci", "year": "1495-1498", "era": "Renaissance"},
            {"title": "The Last Supper", "artist": "Tintoretto", "year": "1592-1594", "era": "Renaissance"},
            {"title": "The Last Supper", "artist": "Peter Paul Rubens", "year": "1631-1632", "era": "Baroque"}
        ]"#;

        let llm = LLM::with_adapter(
            Box::new(ScriptedAdapter::new(vec![
                Ok("The query refers to the Last Supper, the final meal of Jesus.".to_string()),
                Ok(enumeration.to_string()),
                Ok("Annotation for Leonardo.".to_string()),
                // Candidate 2 never reaches annotation: its page open fails.
                Ok("Annotation for Rubens.".to_string()),
            ])),
            "mock",
        );
        let browser = MockBrowser::new(vec![last_supper_images()]).fail_open_page_at(2);
        let counters = browser.counters();
        let state = test_state(llm, Arc::new(browser));

        let result = process_query(&state, "The Last Supper").await.unwrap();

        assert_eq!(result.query, "The Last Supper");
        assert_eq!(
            result.narrative,
            "The query refers to the Last Supper, the final meal of Jesus"
        );
        assert_eq!(result.artworks.all.len(), 3);

        let degraded = &result.artworks.all[1];
        assert_eq!(degraded.image_url, PLACEHOLDER_IMAGE_URL);
        assert!(degraded.annotation.contains("We couldn't retrieve"));
        assert!(degraded.annotation.contains("Tintoretto"));

        assert_eq!(result.artworks.all[0].image_url, "https://cdn.example/shot-2.jpg");
        assert_eq!(result.artworks.all[2].annotation, "Annotation for Rubens.");

        // Two Renaissance entries, one Baroque, in first-seen order.
        let by_era = &result.artworks.by_era;
        assert_eq!(by_era.len(), 2);
        assert_eq!(by_era.get("Renaissance").unwrap().len(), 2);
        assert_eq!(by_era.get("Baroque").unwrap().len(), 1);
        let order: Vec<&str> = by_era.iter().map(|(era, _)| era).collect();
        assert_eq!(order, vec!["Renaissance", "Baroque"]);

        assert_eq!(counters.sessions_released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pipeline_fails_when_interpreter_fails() {
        let llm = LLM::with_adapter(
            Box::new(ScriptedAdapter::new(vec![Err("model down".to_string())])),
            "mock",
        );
        let state = test_state(llm, Arc::new(MockBrowser::new(vec![])));

        let err = process_query(&state, "The Last Supper").await.unwrap_err();
        assert!(matches!(err, AppError::LLMApi(_)));
    }

    #[tokio::test]
    async fn test_pipeline_survives_prose_enumeration_via_heuristics() {
        let prose = "\
Here are notable depictions:
1. \"The Tower of Babel\" by Pieter Bruegel the Elder
Painted in 1563, a Renaissance landmark.";

        let llm = LLM::with_adapter(
            Box::new(ScriptedAdapter::new(vec![
                Ok("The Tower of Babel narrative.".to_string()),
                Ok(prose.to_string()),
                Ok("Annotation for Bruegel.".to_string()),
            ])),
            "mock",
        );
        let state = test_state(
            llm,
            Arc::new(MockBrowser::new(vec![last_supper_images()])),
        );

        let result = process_query(&state, "tower of babel").await.unwrap();
        assert_eq!(result.artworks.all.len(), 1);
        assert_eq!(result.artworks.all[0].work.title, "The Tower of Babel");
        assert_eq!(result.artworks.all[0].work.era, "Renaissance");
    }
}
