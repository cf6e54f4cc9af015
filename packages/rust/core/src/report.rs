//! Report generation port.

use std::path::PathBuf;

use aiinsight_shared::{ReportFormat, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Progress of a generated report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Pending,
    Generating,
    Completed,
    Failed,
}

/// What a report generator produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDescriptor {
    /// Written file, if the generator writes to disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    pub title: String,
    pub status: ReportStatus,
}

/// Renders one payload of type `P` into a report.
#[async_trait]
pub trait ReportGenerator<P: Sync>: Send + Sync {
    async fn generate(&self, payload: &P, format: ReportFormat) -> Result<ReportDescriptor>;
}
