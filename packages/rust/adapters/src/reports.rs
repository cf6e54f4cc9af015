//! JSON report writers.

use std::path::{Path, PathBuf};

use aiinsight_core::{ReportDescriptor, ReportGenerator, ReportStatus};
use aiinsight_shared::{AiInsightError, InsightReport, ModelAnalysis, ReportFormat, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Writes the insight report to `<reports_dir>/insights_<timestamp>.json`.
#[derive(Debug, Clone)]
pub struct InsightReportWriter {
    reports_dir: PathBuf,
}

impl InsightReportWriter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }
}

#[async_trait]
impl ReportGenerator<InsightReport> for InsightReportWriter {
    async fn generate(
        &self,
        payload: &InsightReport,
        format: ReportFormat,
    ) -> Result<ReportDescriptor> {
        ensure_json(format)?;
        let file_name = format!(
            "insights_{}.{}",
            payload.generated_at.format("%Y%m%d_%H%M%S"),
            format.extension()
        );
        let path = write_json(&self.reports_dir, &file_name, payload).await?;

        Ok(ReportDescriptor {
            file_path: Some(path),
            title: format!("AI insight report ({} insights)", payload.insights.len()),
            status: ReportStatus::Completed,
        })
    }
}

/// Writes one file per model to `<reports_dir>/models/<model>.json`.
#[derive(Debug, Clone)]
pub struct ModelReportWriter {
    reports_dir: PathBuf,
}

impl ModelReportWriter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }
}

#[async_trait]
impl ReportGenerator<ModelAnalysis> for ModelReportWriter {
    async fn generate(
        &self,
        payload: &ModelAnalysis,
        format: ReportFormat,
    ) -> Result<ReportDescriptor> {
        ensure_json(format)?;
        let file_name = format!("{}.{}", file_stem(&payload.model_name), format.extension());
        let path = write_json(&self.reports_dir.join("models"), &file_name, payload).await?;

        Ok(ReportDescriptor {
            file_path: Some(path),
            title: format!("Model analysis: {}", payload.model_name),
            status: ReportStatus::Completed,
        })
    }
}

fn ensure_json(format: ReportFormat) -> Result<()> {
    if format == ReportFormat::Json {
        Ok(())
    } else {
        Err(AiInsightError::Report(format!(
            "unsupported report format: {format}"
        )))
    }
}

/// `owner/Model-Name` → `owner_Model-Name`.
fn file_stem(model_name: &str) -> String {
    model_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn write_json<T: Serialize + Sync>(dir: &Path, file_name: &str, payload: &T) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AiInsightError::io(dir, e))?;

    let content = serde_json::to_string_pretty(payload)
        .map_err(|e| AiInsightError::Report(e.to_string()))?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| AiInsightError::io(&path, e))?;

    info!(path = %path.display(), "report written");
    Ok(path)
}
