//! Shared types, error model, and configuration for AI Insight.
//!
//! This crate is the foundation depended on by all other AI Insight crates.
//! It provides:
//! - [`AiInsightError`], the unified error type
//! - Domain types ([`Item`], [`CollectedData`], [`InsightReport`], [`ModelAnalysis`], [`RunId`])
//! - Configuration ([`AppConfig`], [`PipelineOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnalyzerConfig, AppConfig, CollectorConfig, GeneralConfig, MemoryConfig, PipelineConfig,
    PipelineOptions, SchedulerConfig, apply_env_overrides, config_dir, config_file_path,
    init_config, load_config, load_config_at, load_config_from, validate_config,
};
pub use error::{AiInsightError, Result};
pub use types::{
    AiModel, CollectedData, HubModel, Insight, InsightReport, Item, ModelAnalysis,
    ModelDescriptor, Paper, ReportFormat, Repository, RunId,
};
