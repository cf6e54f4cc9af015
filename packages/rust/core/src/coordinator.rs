//! Pipeline coordinator: owns the units and runs collect → analyze → report.

use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use aiinsight_shared::{
    AiInsightError, CollectedData, InsightReport, Item, ModelAnalysis, ModelDescriptor,
    PipelineOptions, Result, RunId,
};
use chrono::Utc;
use futures::FutureExt;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::analyzer::{Analyzer, AnalyzerUnit};
use crate::collector::{Collector, CollectorUnit};
use crate::envelope::{UnitStatus, panic_message};
use crate::memory::{MEMORY_WRITE_TIMEOUT, MemoryStore, remember};
use crate::report::{ReportGenerator, ReportStatus};
use crate::stages::{
    AnalysisOutput, CollectionOutput, NO_ANALYSIS_AVAILABLE, NO_DATA_AVAILABLE,
    PipelineRunReport, ProgressReporter, ReportOutput, SilentProgress,
};
use crate::state::PipelineRunState;

/// Default sources as `(collector name, slot)` pairs.
pub const DEFAULT_SOURCES: [(&str, &str); 4] = [
    ("ai_models", "models"),
    ("github", "repos"),
    ("huggingface", "hf_models"),
    ("arxiv", "papers"),
];

/// Memory key for the collect-stage summary.
pub const LAST_COLLECTION_KEY: &str = "last_collection";

/// Memory key for the analyze-stage summary.
pub const LAST_ANALYSIS_KEY: &str = "last_analysis";

type InsightUnit = AnalyzerUnit<CollectedData, InsightReport>;
type ModelUnit = AnalyzerUnit<ModelDescriptor, ModelAnalysis>;

/// Runs the pipeline stages over a fixed set of units.
pub struct PipelineCoordinator {
    options: PipelineOptions,
    collectors: Vec<Arc<CollectorUnit>>,
    insight_analyzer: InsightUnit,
    model_analyzer: ModelUnit,
    insight_reporter: Box<dyn ReportGenerator<InsightReport>>,
    model_reporter: Box<dyn ReportGenerator<ModelAnalysis>>,
    memory: Option<Arc<dyn MemoryStore>>,
    progress: Arc<dyn ProgressReporter>,
    state: PipelineRunState,
}

impl PipelineCoordinator {
    pub fn builder() -> PipelineCoordinatorBuilder {
        PipelineCoordinatorBuilder::default()
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Cached outputs of the most recent stages.
    pub fn state(&self) -> &PipelineRunState {
        &self.state
    }

    /// `(collector name, status)` in configured order.
    pub fn collector_statuses(&self) -> Vec<(String, UnitStatus)> {
        self.collectors
            .iter()
            .map(|unit| (unit.name().to_string(), unit.status()))
            .collect()
    }

    pub fn insight_status(&self) -> UnitStatus {
        self.insight_analyzer.status()
    }

    pub fn model_status(&self) -> UnitStatus {
        self.model_analyzer.status()
    }

    // -----------------------------------------------------------------------
    // Collect
    // -----------------------------------------------------------------------

    /// Run every collector concurrently and merge their data by slot.
    ///
    /// Never fails: collector failures are reported in `errors` and leave
    /// their slot empty.
    #[instrument(skip_all, fields(collectors = self.collectors.len()))]
    pub async fn run_collection_job(&mut self) -> CollectionOutput {
        let started_at = Utc::now();
        let start = Instant::now();
        self.progress.phase("Collecting data");
        info!("starting collection stage");

        let timeout = self.options.collection_timeout_secs;
        let handles: Vec<_> = self
            .collectors
            .iter()
            .map(|unit| {
                let unit = Arc::clone(unit);
                tokio::spawn(async move {
                    match timeout {
                        Some(secs) => {
                            match tokio::time::timeout(Duration::from_secs(secs), unit.run()).await
                            {
                                Ok(result) => result,
                                Err(_) => unit.fail_with(format!("timed out after {secs}s")),
                            }
                        }
                        None => unit.run().await,
                    }
                })
            })
            .collect();

        let mut data = CollectedData::with_slots(self.collectors.iter().map(|u| u.slot()));
        let mut errors = Vec::new();

        for (unit, handle) in self.collectors.iter().zip(handles) {
            match handle.await {
                Ok(result) => {
                    if !result.errors.is_empty() {
                        errors.push(format!("{}: {}", unit.name(), result.errors.join("; ")));
                    }
                    if result.status.is_usable() {
                        data.set_slot(unit.slot(), result.data);
                    }
                }
                Err(join_err) => {
                    error!(collector = %unit.name(), error = %join_err, "collector task failed");
                    errors.push(format!("{}: {join_err}", unit.name()));
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let counts = data.counts();
        info!(
            items = data.total_items(),
            errors = errors.len(),
            duration_ms,
            "collection stage completed"
        );

        self.state.commit_collection(data.clone());
        remember(
            self.memory.as_deref(),
            LAST_COLLECTION_KEY,
            json!({
                "timestamp": Utc::now(),
                "counts": counts,
                "errors": errors.len(),
            }),
            MEMORY_WRITE_TIMEOUT,
        )
        .await;

        CollectionOutput {
            data,
            errors,
            started_at,
            duration_ms,
        }
    }

    // -----------------------------------------------------------------------
    // Analyze
    // -----------------------------------------------------------------------

    /// Analyze the last committed collection.
    ///
    /// Without collected data this returns [`NO_DATA_AVAILABLE`] as the only
    /// error, runs no analyzer, and leaves the run state untouched.
    #[instrument(skip_all, fields(max_models = self.options.max_model_analyses))]
    pub async fn run_analysis_job(&mut self) -> AnalysisOutput {
        let start = Instant::now();
        self.progress.phase("Analyzing data");

        let Some(data) = self.state.analyzable_data() else {
            warn!("no collected data, skipping analysis");
            return AnalysisOutput::not_run(NO_DATA_AVAILABLE);
        };
        info!(items = data.total_items(), "starting analysis stage");

        let mut errors = Vec::new();
        let insights = self.insight_analyzer.run(data).await;
        if !insights.errors.is_empty() {
            errors.push(format!(
                "{}: {}",
                self.insight_analyzer.name(),
                insights.errors.join("; ")
            ));
        }

        let source = self.options.structural_source.as_str();
        let descriptors: Vec<ModelDescriptor> = match data.slot(source) {
            Some(items) => items
                .iter()
                .filter_map(Item::as_hub_model)
                .map(ModelDescriptor::from)
                .collect(),
            None => {
                debug!(slot = source, "structural source slot not collected");
                Vec::new()
            }
        };

        let cap = self.options.max_model_analyses;
        let skipped_models = descriptors.len().saturating_sub(cap);
        let mut model_analyses = Vec::new();
        for descriptor in descriptors.iter().take(cap) {
            let result = self.model_analyzer.run(descriptor).await;
            match result.payload {
                Some(analysis) if result.status.is_usable() => model_analyses.push(analysis),
                _ => warn!(
                    model = %descriptor.name,
                    errors = ?result.errors,
                    "model analysis failed, skipping"
                ),
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let insight_count = insights
            .payload
            .as_ref()
            .map_or(0, |report| report.insights.len());
        info!(
            insights = insight_count,
            model_analyses = model_analyses.len(),
            skipped_models,
            errors = errors.len(),
            duration_ms,
            "analysis stage completed"
        );

        self.state
            .commit_analysis(insights.clone(), model_analyses.clone());
        remember(
            self.memory.as_deref(),
            LAST_ANALYSIS_KEY,
            json!({
                "timestamp": Utc::now(),
                "insight_count": insight_count,
                "model_analyses": model_analyses.len(),
            }),
            MEMORY_WRITE_TIMEOUT,
        )
        .await;

        AnalysisOutput {
            insights: Some(insights),
            model_analyses,
            skipped_models,
            errors,
            duration_ms,
        }
    }

    // -----------------------------------------------------------------------
    // Report
    // -----------------------------------------------------------------------

    /// Render reports for the last committed analysis. Each delegate call is
    /// isolated: an error or panic is recorded and the loop moves on.
    #[instrument(skip_all, fields(format = %self.options.report_format))]
    pub async fn run_report_job(&mut self) -> ReportOutput {
        let start = Instant::now();
        self.progress.phase("Generating reports");

        if !self.state.has_analysis() {
            warn!("no analysis available, skipping reports");
            return ReportOutput::not_run(NO_ANALYSIS_AVAILABLE);
        }

        let format = self.options.report_format;
        let mut output = ReportOutput::default();

        let insight_payload = self
            .state
            .last_analysis_result
            .as_ref()
            .and_then(|result| result.payload.as_ref());
        if let Some(report) = insight_payload {
            match guarded(self.insight_reporter.generate(report, format)).await {
                Ok(descriptor) => {
                    if descriptor.status == ReportStatus::Failed {
                        output
                            .errors
                            .push(format!("insight report: {} failed", descriptor.title));
                    }
                    output.insight_report = Some(descriptor);
                }
                Err(e) => {
                    warn!(error = %e, "insight report failed");
                    output.errors.push(format!("insight report: {e}"));
                }
            }
        }

        for analysis in &self.state.last_model_analyses {
            match guarded(self.model_reporter.generate(analysis, format)).await {
                Ok(descriptor) => {
                    if descriptor.status == ReportStatus::Failed {
                        output
                            .errors
                            .push(format!("{}: report {} failed", analysis.model_name, descriptor.title));
                    }
                    output.model_reports.push(descriptor);
                }
                Err(e) => {
                    warn!(model = %analysis.model_name, error = %e, "model report failed, skipping");
                    output.errors.push(format!("{}: {e}", analysis.model_name));
                }
            }
        }

        output.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            insight_report = output.insight_report.is_some(),
            model_reports = output.model_reports.len(),
            errors = output.errors.len(),
            duration_ms = output.duration_ms,
            "report stage completed"
        );
        output
    }

    // -----------------------------------------------------------------------
    // Full run and teardown
    // -----------------------------------------------------------------------

    /// Run collect, analyze and report in order, skipping disabled stages.
    /// Errors in one stage never stop the next from attempting to run.
    #[instrument(skip_all)]
    pub async fn run_full_pipeline(&mut self) -> PipelineRunReport {
        let run_id = RunId::new();
        let start = Instant::now();
        info!(%run_id, "starting full pipeline");

        let collection = if self.options.enable_collection {
            Some(self.run_collection_job().await)
        } else {
            info!("collection stage disabled");
            None
        };

        let analysis = if self.options.enable_analysis {
            Some(self.run_analysis_job().await)
        } else {
            info!("analysis stage disabled");
            None
        };

        let reports = if self.options.enable_reports {
            Some(self.run_report_job().await)
        } else {
            info!("report stage disabled");
            None
        };

        let report = PipelineRunReport {
            run_id,
            collection,
            analysis,
            reports,
            total_duration_seconds: start.elapsed().as_secs_f64(),
            completed_at: Utc::now(),
        };

        info!(
            %run_id,
            errors = report.error_count(),
            total_duration_seconds = report.total_duration_seconds,
            "pipeline completed"
        );
        self.progress.done(&report);
        report
    }

    /// Close every collector. Failures are logged and do not stop the others.
    pub async fn cleanup(&self) {
        for unit in &self.collectors {
            if let Err(e) = unit.close().await {
                warn!(collector = %unit.name(), error = %e, "collector close failed");
            }
        }
        debug!("coordinator resources released");
    }

    /// [`run_full_pipeline`](Self::run_full_pipeline) followed by
    /// [`cleanup`](Self::cleanup). Teardown also runs when a stage panics;
    /// the panic resumes afterwards.
    pub async fn run_full_pipeline_and_cleanup(&mut self) -> PipelineRunReport {
        let outcome = AssertUnwindSafe(self.run_full_pipeline()).catch_unwind().await;
        self.finish(outcome).await
    }

    /// [`run_collection_job`](Self::run_collection_job) followed by
    /// [`cleanup`](Self::cleanup) on every exit path.
    pub async fn run_collection_job_and_cleanup(&mut self) -> CollectionOutput {
        let outcome = AssertUnwindSafe(self.run_collection_job()).catch_unwind().await;
        self.finish(outcome).await
    }

    async fn finish<T>(&self, outcome: std::thread::Result<T>) -> T {
        self.cleanup().await;
        match outcome {
            Ok(value) => value,
            Err(panic) => {
                error!(reason = %panic_message(panic.as_ref()), "stage aborted");
                std::panic::resume_unwind(panic)
            }
        }
    }
}

/// Await a report delegate, turning a panic into a `Report` error.
async fn guarded<T>(call: impl Future<Output = Result<T>>) -> Result<T> {
    AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(AiInsightError::Report(panic_message(panic.as_ref()))))
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`PipelineCoordinator`].
#[derive(Default)]
pub struct PipelineCoordinatorBuilder {
    options: Option<PipelineOptions>,
    collectors: Vec<CollectorUnit>,
    insight_analyzer: Option<InsightUnit>,
    model_analyzer: Option<ModelUnit>,
    insight_reporter: Option<Box<dyn ReportGenerator<InsightReport>>>,
    model_reporter: Option<Box<dyn ReportGenerator<ModelAnalysis>>>,
    memory: Option<Arc<dyn MemoryStore>>,
    progress: Option<Arc<dyn ProgressReporter>>,
}

impl PipelineCoordinatorBuilder {
    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Add a collector whose data lands in `slot`. Order is preserved.
    pub fn collector(self, slot: impl Into<String>, collector: impl Collector + 'static) -> Self {
        self.boxed_collector(slot, Box::new(collector))
    }

    pub fn boxed_collector(mut self, slot: impl Into<String>, collector: Box<dyn Collector>) -> Self {
        self.collectors.push(CollectorUnit::new(slot, collector));
        self
    }

    pub fn insight_analyzer(
        mut self,
        analyzer: impl Analyzer<Input = CollectedData, Output = InsightReport> + 'static,
    ) -> Self {
        self.insight_analyzer = Some(AnalyzerUnit::new(analyzer));
        self
    }

    pub fn model_analyzer(
        mut self,
        analyzer: impl Analyzer<Input = ModelDescriptor, Output = ModelAnalysis> + 'static,
    ) -> Self {
        self.model_analyzer = Some(AnalyzerUnit::new(analyzer));
        self
    }

    pub fn insight_reporter(
        mut self,
        reporter: impl ReportGenerator<InsightReport> + 'static,
    ) -> Self {
        self.insight_reporter = Some(Box::new(reporter));
        self
    }

    pub fn model_reporter(mut self, reporter: impl ReportGenerator<ModelAnalysis> + 'static) -> Self {
        self.model_reporter = Some(Box::new(reporter));
        self
    }

    pub fn memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Validate and assemble the coordinator. Analyzers and reporters are
    /// required; slot names must be unique.
    pub fn build(self) -> Result<PipelineCoordinator> {
        let mut seen = HashSet::new();
        for unit in &self.collectors {
            if !seen.insert(unit.slot().to_string()) {
                return Err(AiInsightError::config(format!(
                    "slot `{}` is filled by more than one collector",
                    unit.slot()
                )));
            }
        }

        let options = self.options.unwrap_or_default();
        if options.max_model_analyses == 0 {
            return Err(AiInsightError::config("max_model_analyses must be at least 1"));
        }

        Ok(PipelineCoordinator {
            options,
            collectors: self.collectors.into_iter().map(Arc::new).collect(),
            insight_analyzer: self
                .insight_analyzer
                .ok_or_else(|| AiInsightError::config("insight analyzer not configured"))?,
            model_analyzer: self
                .model_analyzer
                .ok_or_else(|| AiInsightError::config("model analyzer not configured"))?,
            insight_reporter: self
                .insight_reporter
                .ok_or_else(|| AiInsightError::config("insight report generator not configured"))?,
            model_reporter: self
                .model_reporter
                .ok_or_else(|| AiInsightError::config("model report generator not configured"))?,
            memory: self.memory,
            progress: self.progress.unwrap_or_else(|| Arc::new(SilentProgress)),
            state: PipelineRunState::default(),
        })
    }
}
