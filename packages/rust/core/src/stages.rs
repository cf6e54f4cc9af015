//! Outputs of the collect, analyze and report stages.

use aiinsight_shared::{CollectedData, InsightReport, ModelAnalysis, RunId};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::envelope::AnalysisResult;
use crate::report::ReportDescriptor;

/// Returned by the analyze stage when nothing has been collected yet.
pub const NO_DATA_AVAILABLE: &str = "No data available. Run collection first.";

/// Returned by the report stage when nothing has been analyzed yet.
pub const NO_ANALYSIS_AVAILABLE: &str = "No analysis available. Run analysis first.";

/// Aggregated collect-stage output. One slot per configured source.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionOutput {
    pub data: CollectedData,
    /// `"<collector>: <errors>"` per collector that failed or partially failed.
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Analyze-stage output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisOutput {
    pub insights: Option<AnalysisResult<InsightReport>>,
    pub model_analyses: Vec<ModelAnalysis>,
    /// Models beyond the per-run cap that were not analyzed.
    pub skipped_models: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl AnalysisOutput {
    pub(crate) fn not_run(reason: &str) -> Self {
        Self {
            errors: vec![reason.to_string()],
            ..Self::default()
        }
    }
}

/// Report-stage output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportOutput {
    pub insight_report: Option<ReportDescriptor>,
    pub model_reports: Vec<ReportDescriptor>,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl ReportOutput {
    pub(crate) fn not_run(reason: &str) -> Self {
        Self {
            errors: vec![reason.to_string()],
            ..Self::default()
        }
    }
}

/// Result of [`run_full_pipeline`](crate::PipelineCoordinator::run_full_pipeline).
/// A disabled stage is `None`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunReport {
    pub run_id: RunId,
    pub collection: Option<CollectionOutput>,
    pub analysis: Option<AnalysisOutput>,
    pub reports: Option<ReportOutput>,
    pub total_duration_seconds: f64,
    pub completed_at: DateTime<Utc>,
}

impl PipelineRunReport {
    /// Total error count across all stages that ran.
    pub fn error_count(&self) -> usize {
        self.collection.as_ref().map_or(0, |c| c.errors.len())
            + self.analysis.as_ref().map_or(0, |a| a.errors.len())
            + self.reports.as_ref().map_or(0, |r| r.errors.len())
    }

    /// Compact JSON view: counts and errors, without collected payloads.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id,
            "completed_at": self.completed_at,
            "total_duration_seconds": self.total_duration_seconds,
            "collection": self.collection.as_ref().map(|c| serde_json::json!({
                "counts": c.data.counts(),
                "total_items": c.data.total_items(),
                "errors": c.errors,
                "duration_ms": c.duration_ms,
            })),
            "analysis": self.analysis.as_ref().map(|a| serde_json::json!({
                "insight_status": a.insights.as_ref().map(|r| r.status),
                "insight_count": a.insights
                    .as_ref()
                    .and_then(|r| r.payload.as_ref())
                    .map_or(0, |p| p.insights.len()),
                "model_analyses": a.model_analyses.len(),
                "skipped_models": a.skipped_models,
                "errors": a.errors,
                "duration_ms": a.duration_ms,
            })),
            "reports": self.reports.as_ref().map(|r| serde_json::json!({
                "insight_report": r.insight_report.as_ref().and_then(|d| d.file_path.clone()),
                "model_reports": r.model_reports.len(),
                "errors": r.errors,
                "duration_ms": r.duration_ms,
            })),
        })
    }
}

/// Progress callback for reporting stage transitions.
pub trait ProgressReporter: Send + Sync {
    /// Called when a stage starts.
    fn phase(&self, name: &str);
    /// Called when a full pipeline run completes.
    fn done(&self, report: &PipelineRunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _report: &PipelineRunReport) {}
}
