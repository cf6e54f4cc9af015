//! Reference units for the AI Insight pipeline.
//!
//! - [`FeedCollector`]: reads JSON feed snapshots from disk
//! - [`TrendInsightAnalyzer`] and [`ModelStructureAnalyzer`]: heuristic analyzers
//! - [`InsightReportWriter`] and [`ModelReportWriter`]: JSON report output

pub mod analyzers;
pub mod collectors;
pub mod reports;

pub use analyzers::{ModelStructureAnalyzer, TrendInsightAnalyzer};
pub use collectors::{FeedCollector, FeedKind};
pub use reports::{InsightReportWriter, ModelReportWriter};

use aiinsight_core::{Collector, DEFAULT_SOURCES, PipelineCoordinator, PipelineCoordinatorBuilder};
use aiinsight_shared::{AppConfig, PipelineOptions};

/// The four default feed collectors as `(slot, collector)` pairs, in
/// configured order.
pub fn default_collectors(config: &AppConfig) -> Vec<(String, Box<dyn Collector>)> {
    DEFAULT_SOURCES
        .iter()
        .filter_map(|(source, slot)| {
            let kind = FeedKind::from_source(source)?;
            let collector: Box<dyn Collector> = Box::new(FeedCollector::from_config(kind, config));
            Some((slot.to_string(), collector))
        })
        .collect()
}

/// Builder preloaded with the reference units and options from `config`.
/// Callers add a memory store and progress reporter as needed.
pub fn default_builder(config: &AppConfig) -> PipelineCoordinatorBuilder {
    default_collectors(config).into_iter().fold(
        PipelineCoordinator::builder()
            .options(PipelineOptions::from(config))
            .insight_analyzer(TrendInsightAnalyzer::from_config(config))
            .model_analyzer(ModelStructureAnalyzer)
            .insight_reporter(InsightReportWriter::new(&config.general.reports_dir))
            .model_reporter(ModelReportWriter::new(&config.general.reports_dir)),
        |builder, (slot, collector)| builder.boxed_collector(slot, collector),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiinsight_core::{NO_DATA_AVAILABLE, UnitStatus};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn default_collectors_follow_source_order() {
        let collectors = default_collectors(&AppConfig::default());
        let pairs: Vec<(String, String)> = collectors
            .iter()
            .map(|(slot, c)| (c.name().to_string(), slot.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("ai_models".to_string(), "models".to_string()),
                ("github".to_string(), "repos".to_string()),
                ("huggingface".to_string(), "hf_models".to_string()),
                ("arxiv".to_string(), "papers".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn full_pipeline_over_feed_snapshots() {
        let root = std::env::temp_dir().join(format!("aiinsight_e2e_{}", Uuid::now_v7()));
        let feeds = root.join("feeds");
        std::fs::create_dir_all(&feeds).unwrap();
        std::fs::write(
            feeds.join("huggingface.json"),
            json!([
                {"model_id": "meta-llama/Llama-3.1-8B", "author": "meta-llama",
                 "pipeline_tag": "text-generation", "tags": ["llm"]},
                {"model_id": "google/bert-base-110m", "tags": ["transformers"]},
            ])
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            feeds.join("github.json"),
            json!([{"full_name": "karpathy/nanoGPT", "stars": 30000, "language": "Python"}])
                .to_string(),
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.collector.feed_dir = feeds;
        config.general.reports_dir = root.join("reports");

        let mut coordinator = default_builder(&config).build().unwrap();

        let analysis = coordinator.run_analysis_job().await;
        assert_eq!(analysis.errors, vec![NO_DATA_AVAILABLE.to_string()]);

        let report = coordinator.run_full_pipeline_and_cleanup().await;

        let collection = report.collection.as_ref().unwrap();
        assert_eq!(collection.data.counts()["hf_models"], 2);
        assert_eq!(collection.data.counts()["repos"], 1);
        assert_eq!(collection.data.counts()["models"], 0);
        assert_eq!(collection.errors.len(), 2);
        assert!(collection.errors.contains(&"ai_models: Invalid configuration for ai_models".to_string()));

        let analysis = report.analysis.as_ref().unwrap();
        assert_eq!(analysis.model_analyses.len(), 2);
        assert_eq!(coordinator.model_status(), UnitStatus::Partial);

        let reports = report.reports.as_ref().unwrap();
        assert!(reports.errors.is_empty());
        assert_eq!(reports.model_reports.len(), 2);
        let insight_path = reports
            .insight_report
            .as_ref()
            .and_then(|d| d.file_path.clone())
            .unwrap();
        assert!(insight_path.exists());
    }
}
