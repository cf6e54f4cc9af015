//! Cached outputs of the most recent stages.

use aiinsight_shared::{CollectedData, InsightReport, ModelAnalysis};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::envelope::AnalysisResult;

/// Committed output of a collect stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSnapshot {
    pub data: CollectedData,
    pub collected_at: DateTime<Utc>,
}

/// Run state owned by the coordinator.
///
/// Each commit replaces its slot wholesale. A stage that cannot run leaves
/// the previous values in place.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineRunState {
    pub last_collected: Option<CollectionSnapshot>,
    pub last_analysis_result: Option<AnalysisResult<InsightReport>>,
    pub last_model_analyses: Vec<ModelAnalysis>,
    pub last_analysis_at: Option<DateTime<Utc>>,
}

impl PipelineRunState {
    /// Collected data for the analyze stage. Any committed collection
    /// counts, including one whose slots are all empty.
    pub fn analyzable_data(&self) -> Option<&CollectedData> {
        self.last_collected.as_ref().map(|snapshot| &snapshot.data)
    }

    /// `true` when the report stage has something to render.
    pub fn has_analysis(&self) -> bool {
        let has_insights = self
            .last_analysis_result
            .as_ref()
            .is_some_and(|r| r.payload.is_some());
        has_insights || !self.last_model_analyses.is_empty()
    }

    pub(crate) fn commit_collection(&mut self, data: CollectedData) {
        self.last_collected = Some(CollectionSnapshot {
            data,
            collected_at: Utc::now(),
        });
    }

    pub(crate) fn commit_analysis(
        &mut self,
        insights: AnalysisResult<InsightReport>,
        model_analyses: Vec<ModelAnalysis>,
    ) {
        self.last_analysis_result = Some(insights);
        self.last_model_analyses = model_analyses;
        self.last_analysis_at = Some(Utc::now());
    }
}
