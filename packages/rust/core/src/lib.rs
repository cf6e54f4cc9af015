//! Pipeline core for AI Insight.
//!
//! Collectors and analyzers implement small capability traits
//! ([`Collector`], [`Analyzer`]); the [`CollectorUnit`] and [`AnalyzerUnit`]
//! wrappers own their lifecycle and turn every failure into an envelope.
//! [`PipelineCoordinator`] runs the collect, analyze and report stages and
//! keeps their latest outputs in a [`PipelineRunState`].

pub mod analyzer;
pub mod collector;
pub mod coordinator;
pub mod envelope;
pub mod memory;
pub mod report;
pub mod stages;
pub mod state;

#[cfg(test)]
mod test_support;

pub use analyzer::{Analyzer, AnalyzerUnit};
pub use collector::{Collector, CollectorUnit};
pub use coordinator::{
    DEFAULT_SOURCES, LAST_ANALYSIS_KEY, LAST_COLLECTION_KEY, PipelineCoordinator,
    PipelineCoordinatorBuilder,
};
pub use envelope::{AnalysisResult, CollectionResult, Envelope, UnitStatus};
pub use memory::MemoryStore;
pub use report::{ReportDescriptor, ReportGenerator, ReportStatus};
pub use stages::{
    AnalysisOutput, CollectionOutput, NO_ANALYSIS_AVAILABLE, NO_DATA_AVAILABLE,
    PipelineRunReport, ProgressReporter, ReportOutput, SilentProgress,
};
pub use state::{CollectionSnapshot, PipelineRunState};
