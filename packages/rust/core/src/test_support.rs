//! Stub units shared by the unit tests of this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aiinsight_shared::{
    AiInsightError, AiModel, CollectedData, HubModel, Insight, InsightReport, Item,
    ModelAnalysis, ModelDescriptor, ReportFormat, Result,
};
use async_trait::async_trait;
use chrono::Utc;

use crate::analyzer::Analyzer;
use crate::collector::Collector;
use crate::envelope::{AnalysisResult, CollectionResult};
use crate::memory::MemoryStore;
use crate::report::{ReportDescriptor, ReportGenerator, ReportStatus};
use crate::stages::{PipelineRunReport, ProgressReporter};

// ---------------------------------------------------------------------------
// Collectors
// ---------------------------------------------------------------------------

/// Returns `count` AI model items.
pub struct StaticCollector {
    pub name: String,
    pub count: usize,
    pub errors: Vec<String>,
    pub closes: Arc<AtomicUsize>,
}

impl StaticCollector {
    pub fn new(name: &str, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
            errors: vec![],
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}

#[async_trait]
impl Collector for StaticCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate_config(&self) -> bool {
        true
    }

    async fn collect(&self) -> Result<CollectionResult> {
        let items = (0..self.count)
            .map(|i| {
                Item::AiModel(AiModel {
                    name: format!("{}-{i}", self.name),
                    provider: "acme".into(),
                    release_date: None,
                    description: None,
                    url: None,
                })
            })
            .collect();
        Ok(CollectionResult::new(items, self.errors.clone()))
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Returns `count` hub model items named `acme/model-<i>`.
pub struct HubCollector {
    pub name: String,
    pub count: usize,
}

#[async_trait]
impl Collector for HubCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate_config(&self) -> bool {
        true
    }

    async fn collect(&self) -> Result<CollectionResult> {
        Ok(CollectionResult::new(hub_items(self.count), vec![]))
    }
}

/// Returns the next count from `runs` on each call, repeating the last one.
pub struct ScriptedHubCollector {
    pub name: String,
    pub runs: Mutex<Vec<usize>>,
}

impl ScriptedHubCollector {
    pub fn new(name: &str, runs: impl IntoIterator<Item = usize>) -> Self {
        let mut runs: Vec<usize> = runs.into_iter().collect();
        runs.reverse();
        Self {
            name: name.into(),
            runs: Mutex::new(runs),
        }
    }
}

#[async_trait]
impl Collector for ScriptedHubCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate_config(&self) -> bool {
        true
    }

    async fn collect(&self) -> Result<CollectionResult> {
        let count = {
            let mut runs = self.runs.lock().unwrap();
            if runs.len() > 1 {
                runs.pop().unwrap()
            } else {
                runs.last().copied().unwrap_or(0)
            }
        };
        Ok(CollectionResult::new(hub_items(count), vec![]))
    }
}

fn hub_items(count: usize) -> Vec<Item> {
    (0..count)
        .map(|i| {
            Item::HubModel(HubModel {
                model_id: format!("acme/model-{i}"),
                author: Some("acme".into()),
                pipeline_tag: Some("text-generation".into()),
                downloads: 100 * i as u64,
                likes: i as u64,
                tags: vec!["llm".into()],
            })
        })
        .collect()
}

/// Always fails with a network error, optionally after a delay.
pub struct FailingCollector {
    pub name: String,
    pub message: String,
    pub delay: Duration,
}

impl FailingCollector {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Collector for FailingCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate_config(&self) -> bool {
        true
    }

    async fn collect(&self) -> Result<CollectionResult> {
        tokio::time::sleep(self.delay).await;
        Err(AiInsightError::Network(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Err(AiInsightError::Network("close failed".into()))
    }
}

/// Panics inside its body.
pub struct PanickingCollector {
    pub name: String,
}

impl PanickingCollector {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Collector for PanickingCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate_config(&self) -> bool {
        true
    }

    async fn collect(&self) -> Result<CollectionResult> {
        panic!("feed exploded");
    }
}

/// Rejects its configuration and counts body invocations.
pub struct InvalidCollector {
    pub name: String,
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Collector for InvalidCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate_config(&self) -> bool {
        false
    }

    async fn collect(&self) -> Result<CollectionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CollectionResult::new(vec![], vec![]))
    }
}

/// Sleeps before returning nothing.
pub struct SlowCollector {
    pub name: String,
    pub delay: Duration,
}

#[async_trait]
impl Collector for SlowCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate_config(&self) -> bool {
        true
    }

    async fn collect(&self) -> Result<CollectionResult> {
        tokio::time::sleep(self.delay).await;
        Ok(CollectionResult::new(vec![], vec![]))
    }
}

// ---------------------------------------------------------------------------
// Analyzers
// ---------------------------------------------------------------------------

/// One insight per non-empty slot, totals from the input.
#[derive(Default)]
pub struct TotalsAnalyzer {
    pub fail: bool,
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Analyzer for TotalsAnalyzer {
    type Input = CollectedData;
    type Output = InsightReport;

    fn name(&self) -> &str {
        "insight_analyzer"
    }

    async fn analyze(&self, input: &CollectedData) -> Result<AnalysisResult<InsightReport>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AiInsightError::Analysis("engine offline".into()));
        }
        let insights = input
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(slot, items)| Insight {
                category: slot.to_string(),
                title: format!("{} {slot}", items.len()),
                detail: String::new(),
            })
            .collect();
        Ok(AnalysisResult::success(InsightReport {
            generated_at: Utc::now(),
            insights,
            totals: input.counts(),
        }))
    }
}

/// Counts invocations. Fails on names containing `broken`, panics on `panic`.
#[derive(Default)]
pub struct CountingModelAnalyzer {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Analyzer for CountingModelAnalyzer {
    type Input = ModelDescriptor;
    type Output = ModelAnalysis;

    fn name(&self) -> &str {
        "model_analyzer"
    }

    async fn analyze(&self, input: &ModelDescriptor) -> Result<AnalysisResult<ModelAnalysis>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if input.name.contains("broken") {
            return Err(AiInsightError::Analysis("broken model card".into()));
        }
        if input.name.contains("panic") {
            panic!("analyzer bug");
        }
        Ok(AnalysisResult::success(ModelAnalysis {
            model_name: input.name.clone(),
            provider: input.provider.clone(),
            model_type: input.model_type.clone(),
            architecture: "decoder-only transformer".into(),
            parameter_scale_b: None,
            highlights: vec![],
        }))
    }
}

// ---------------------------------------------------------------------------
// Reporters and memory
// ---------------------------------------------------------------------------

/// Counts calls. Model reports fail for names containing `unrenderable`
/// and panic for names containing `crash`.
#[derive(Default, Clone)]
pub struct RecordingReporter {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ReportGenerator<InsightReport> for RecordingReporter {
    async fn generate(
        &self,
        payload: &InsightReport,
        _format: ReportFormat,
    ) -> Result<ReportDescriptor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ReportDescriptor {
            file_path: Some("reports/insights.json".into()),
            title: format!("{} insights", payload.insights.len()),
            status: ReportStatus::Completed,
        })
    }
}

#[async_trait]
impl ReportGenerator<ModelAnalysis> for RecordingReporter {
    async fn generate(
        &self,
        payload: &ModelAnalysis,
        _format: ReportFormat,
    ) -> Result<ReportDescriptor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if payload.model_name.contains("unrenderable") {
            return Err(AiInsightError::Report("template missing".into()));
        }
        if payload.model_name.contains("crash") {
            panic!("renderer bug");
        }
        Ok(ReportDescriptor {
            file_path: None,
            title: payload.model_name.clone(),
            status: ReportStatus::Completed,
        })
    }
}

/// In-memory store that records writes, rejects them all, or never answers.
#[derive(Default)]
pub struct RecordingMemory {
    entries: Mutex<Vec<(String, serde_json::Value)>>,
    fail: bool,
    hang: bool,
}

impl RecordingMemory {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<(String, serde_json::Value)> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MemoryStore for RecordingMemory {
    async fn store(&self, key: &str, value: serde_json::Value) -> Result<()> {
        if self.fail {
            return Err(AiInsightError::Storage("disk full".into()));
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.entries.lock().unwrap().push((key.to_string(), value));
        Ok(())
    }
}

/// Panics when a stage announces the given phase.
pub struct PanickingProgress {
    pub phase: &'static str,
}

impl ProgressReporter for PanickingProgress {
    fn phase(&self, name: &str) {
        if name == self.phase {
            panic!("progress sink gone");
        }
    }

    fn done(&self, _report: &PipelineRunReport) {}
}
