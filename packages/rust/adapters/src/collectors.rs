//! Feed-snapshot collectors.
//!
//! Each collector reads a JSON array from `<feed_dir>/<source>.json`, decodes
//! entries one at a time, and applies the source's filters and limits from
//! `[collector]` config.

use std::path::PathBuf;

use aiinsight_core::{CollectionResult, Collector};
use aiinsight_shared::{
    AiInsightError, AiModel, AppConfig, HubModel, Item, Paper, Repository, Result,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Record kind a feed holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    AiModels,
    Repositories,
    HubModels,
    Papers,
}

impl FeedKind {
    /// Collector name, also the feed file stem.
    pub fn source_name(&self) -> &'static str {
        match self {
            Self::AiModels => "ai_models",
            Self::Repositories => "github",
            Self::HubModels => "huggingface",
            Self::Papers => "arxiv",
        }
    }

    pub fn from_source(name: &str) -> Option<Self> {
        match name {
            "ai_models" => Some(Self::AiModels),
            "github" => Some(Self::Repositories),
            "huggingface" => Some(Self::HubModels),
            "arxiv" => Some(Self::Papers),
            _ => None,
        }
    }
}

/// Filters applied after decoding. Empty lists keep everything.
#[derive(Debug, Clone)]
struct FeedFilter {
    providers: Vec<String>,
    tags: Vec<String>,
    categories: Vec<String>,
    limit: usize,
}

impl FeedFilter {
    fn keeps(&self, item: &Item) -> bool {
        match item {
            Item::AiModel(m) => {
                self.providers.is_empty()
                    || self
                        .providers
                        .iter()
                        .any(|p| p.eq_ignore_ascii_case(&m.provider))
            }
            Item::Repository(_) => true,
            Item::HubModel(m) => {
                self.tags.is_empty()
                    || m.tags.is_empty()
                    || m.tags.iter().any(|t| self.tags.contains(t))
            }
            Item::Paper(p) => {
                self.categories.is_empty() || p.categories.iter().any(|c| self.categories.contains(c))
            }
        }
    }
}

/// Collector backed by a JSON feed snapshot on disk.
#[derive(Debug, Clone)]
pub struct FeedCollector {
    kind: FeedKind,
    feed_path: PathBuf,
    filter: FeedFilter,
}

impl FeedCollector {
    /// Build the collector for `kind` from the `[collector]` section.
    pub fn from_config(kind: FeedKind, config: &AppConfig) -> Self {
        let c = &config.collector;
        let mut filter = FeedFilter {
            providers: Vec::new(),
            tags: Vec::new(),
            categories: Vec::new(),
            limit: usize::MAX,
        };
        match kind {
            FeedKind::AiModels => filter.providers = c.ai_model_sources.clone(),
            FeedKind::Repositories => filter.limit = c.github_max_repos,
            FeedKind::HubModels => {
                filter.tags = c.hf_model_tags.clone();
                filter.limit = c.hf_max_models;
            }
            FeedKind::Papers => {
                filter.categories = c.arxiv_categories.clone();
                filter.limit = c.arxiv_max_papers;
            }
        }

        Self {
            kind,
            feed_path: c.feed_dir.join(format!("{}.json", kind.source_name())),
            filter,
        }
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    pub fn feed_path(&self) -> &std::path::Path {
        &self.feed_path
    }

    fn decode(&self, entry: serde_json::Value) -> std::result::Result<Item, serde_json::Error> {
        match self.kind {
            FeedKind::AiModels => decode_as::<AiModel>(entry).map(Item::AiModel),
            FeedKind::Repositories => decode_as::<Repository>(entry).map(Item::Repository),
            FeedKind::HubModels => decode_as::<HubModel>(entry).map(Item::HubModel),
            FeedKind::Papers => decode_as::<Paper>(entry).map(Item::Paper),
        }
    }
}

fn decode_as<T: DeserializeOwned>(entry: serde_json::Value) -> serde_json::Result<T> {
    serde_json::from_value(entry)
}

#[async_trait]
impl Collector for FeedCollector {
    fn name(&self) -> &str {
        self.kind.source_name()
    }

    async fn validate_config(&self) -> bool {
        if self.filter.limit == 0 {
            warn!(source = self.name(), "item limit is zero");
            return false;
        }
        match tokio::fs::try_exists(&self.feed_path).await {
            Ok(true) => true,
            _ => {
                warn!(source = self.name(), path = %self.feed_path.display(), "feed file not found");
                false
            }
        }
    }

    async fn collect(&self) -> Result<CollectionResult> {
        let content = tokio::fs::read_to_string(&self.feed_path)
            .await
            .map_err(|e| AiInsightError::io(&self.feed_path, e))?;

        let entries: Vec<serde_json::Value> = serde_json::from_str(&content).map_err(|e| {
            AiInsightError::parse(format!("{}: {e}", self.feed_path.display()))
        })?;

        let mut errors = Vec::new();
        let mut decoded = Vec::new();
        for (i, entry) in entries.into_iter().enumerate() {
            match self.decode(entry) {
                Ok(item) => decoded.push(item),
                Err(e) => errors.push(format!("entry {i}: {e}")),
            }
        }

        let decoded_count = decoded.len();
        let items: Vec<Item> = decoded
            .into_iter()
            .filter(|item| self.filter.keeps(item))
            .take(self.filter.limit)
            .collect();
        let dropped = decoded_count - items.len();

        debug!(
            source = self.name(),
            kept = items.len(),
            dropped,
            invalid = errors.len(),
            "feed decoded"
        );

        Ok(CollectionResult::new(items, errors)
            .with_metadata("feed_path", self.feed_path.display().to_string())
            .with_metadata("dropped", dropped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiinsight_core::{CollectorUnit, UnitStatus};
    use serde_json::json;
    use uuid::Uuid;

    fn feed_config(files: &[(&str, serde_json::Value)]) -> AppConfig {
        let dir = std::env::temp_dir().join(format!("aiinsight_feeds_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        for (name, body) in files {
            std::fs::write(dir.join(format!("{name}.json")), body.to_string()).unwrap();
        }
        let mut config = AppConfig::default();
        config.collector.feed_dir = dir;
        config
    }

    #[tokio::test]
    async fn ai_models_filtered_by_provider() {
        let config = feed_config(&[(
            "ai_models",
            json!([
                {"name": "GPT-5", "provider": "OpenAI"},
                {"name": "Claude", "provider": "anthropic"},
                {"name": "Unknown-1", "provider": "garage-lab"},
            ]),
        )]);
        let collector = FeedCollector::from_config(FeedKind::AiModels, &config);
        assert!(collector.validate_config().await);

        let result = collector.collect().await.unwrap();
        assert_eq!(result.status, UnitStatus::Success);
        let names: Vec<&str> = result.data.iter().map(Item::label).collect();
        assert_eq!(names, vec!["GPT-5", "Claude"]);
        assert_eq!(result.metadata["dropped"], 1);
    }

    #[tokio::test]
    async fn bad_entries_make_partial_result() {
        let config = feed_config(&[(
            "arxiv",
            json!([
                {"arxiv_id": "2401.1", "title": "Agents", "categories": ["cs.AI"]},
                {"arxiv_id": "2401.2"},
                {"arxiv_id": "2401.3", "title": "Proteins", "categories": ["q-bio.BM"]},
            ]),
        )]);
        let unit = CollectorUnit::new(
            "papers",
            Box::new(FeedCollector::from_config(FeedKind::Papers, &config)),
        );

        let result = unit.run().await;
        assert_eq!(result.status, UnitStatus::Partial);
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("entry 1:"));
        assert_eq!(result.source, "arxiv");
    }

    #[tokio::test]
    async fn hub_models_filtered_and_truncated() {
        let mut config = feed_config(&[(
            "huggingface",
            json!([
                {"model_id": "a/one", "tags": ["llm"]},
                {"model_id": "b/two", "tags": ["audio"]},
                {"model_id": "c/three"},
                {"model_id": "d/four", "tags": ["pytorch", "vision"]},
            ]),
        )]);
        config.collector.hf_max_models = 2;

        let collector = FeedCollector::from_config(FeedKind::HubModels, &config);
        let result = collector.collect().await.unwrap();
        let ids: Vec<&str> = result.data.iter().map(Item::label).collect();
        assert_eq!(ids, vec!["a/one", "c/three"]);
        assert_eq!(result.metadata["dropped"], 2);
    }

    #[tokio::test]
    async fn missing_feed_or_zero_limit_fails_validation() {
        let mut config = feed_config(&[("github", json!([]))]);
        let missing = FeedCollector::from_config(FeedKind::Papers, &config);
        assert!(!missing.validate_config().await);

        config.collector.github_max_repos = 0;
        let zero = FeedCollector::from_config(FeedKind::Repositories, &config);
        assert!(!zero.validate_config().await);

        let unit = CollectorUnit::new("papers", Box::new(missing));
        let result = unit.run().await;
        assert_eq!(result.errors, vec!["Invalid configuration for arxiv".to_string()]);
    }

    #[tokio::test]
    async fn malformed_feed_is_a_body_error() {
        let config = feed_config(&[("github", json!({"not": "an array"}))]);
        let collector = FeedCollector::from_config(FeedKind::Repositories, &config);
        let err = collector.collect().await.unwrap_err();
        assert!(err.to_string().starts_with("parse error:"));
    }

    #[test]
    fn source_names_roundtrip() {
        for kind in [
            FeedKind::AiModels,
            FeedKind::Repositories,
            FeedKind::HubModels,
            FeedKind::Papers,
        ] {
            assert_eq!(FeedKind::from_source(kind.source_name()), Some(kind));
        }
        assert_eq!(FeedKind::from_source("rss"), None);
    }
}
