use crate::browser::Browser;
use crate::config::Config;
use crate::llm::LLM;
use crate::stats::StatsTracker;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub llm: Arc<LLM>,
    pub browser: Arc<dyn Browser>,
    pub stats: StatsTracker,
}

/// A model-proposed artwork. Fields the model (or the fallback extractor)
/// could not fill stay as empty strings rather than going absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateWork {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub era: String,
}

/// A candidate work carrying its image lookup result and generated
/// annotation. Produced one-for-one from candidates; a failed lookup or
/// generation degrades the entry, it never drops it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedWork {
    #[serde(flatten)]
    pub work: CandidateWork,
    pub image_url: String,
    pub annotation: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub query: String,
    pub narrative: String,
    pub narrative_description: String,
    pub artworks: ArtworkGroups,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkGroups {
    pub all: Vec<AnnotatedWork>,
    pub by_era: EraGroups,
}

/// Era buckets in first-seen order. Serialized as a JSON object whose key
/// order follows insertion, which a plain map would not preserve.
#[derive(Debug, Clone, Default)]
pub struct EraGroups(Vec<(String, Vec<AnnotatedWork>)>);

impl EraGroups {
    pub fn push(&mut self, era: String, work: AnnotatedWork) {
        match self.0.iter_mut().find(|(key, _)| *key == era) {
            Some((_, group)) => group.push(work),
            None => self.0.push((era, vec![work])),
        }
    }

    pub fn get(&self, era: &str) -> Option<&[AnnotatedWork]> {
        self.0
            .iter()
            .find(|(key, _)| key == era)
            .map(|(_, group)| group.as_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[AnnotatedWork])> {
        self.0
            .iter()
            .map(|(era, group)| (era.as_str(), group.as_slice()))
    }
}

impl Serialize for EraGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (era, group) in &self.0 {
            map.serialize_entry(era, group)?;
        }
        map.end()
    }
}

// API request/response types

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
