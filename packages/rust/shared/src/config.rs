//! Application configuration for AI Insight.
//!
//! User config lives at `~/.aiinsight/aiinsight.toml`.
//! Environment variables (`AI_INSIGHT_*`) override config file values, which
//! override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AiInsightError, Result};
use crate::types::ReportFormat;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "aiinsight.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".aiinsight";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "AI_INSIGHT_";

// ---------------------------------------------------------------------------
// Config structs (matching aiinsight.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[general]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Deployment environment label (`development`, `production`, ...).
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Where report generators write their output.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            environment: default_environment(),
            data_dir: default_data_dir(),
            reports_dir: default_reports_dir(),
        }
    }
}

fn default_app_name() -> String {
    "AI Insight".into()
}
fn default_environment() -> String {
    "development".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

/// `[collector]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Directory holding `<source>.json` feed snapshots.
    #[serde(default = "default_feed_dir")]
    pub feed_dir: PathBuf,

    /// Vendors whose model announcements are kept.
    #[serde(default = "default_ai_model_sources")]
    pub ai_model_sources: Vec<String>,

    /// Repositories of particular interest (`owner/name`).
    #[serde(default = "default_github_repos")]
    pub github_repos: Vec<String>,

    #[serde(default = "default_github_max_repos")]
    pub github_max_repos: usize,

    /// Hub tags to keep; empty keeps everything.
    #[serde(default = "default_hf_model_tags")]
    pub hf_model_tags: Vec<String>,

    #[serde(default = "default_hf_max_models")]
    pub hf_max_models: usize,

    #[serde(default = "default_arxiv_categories")]
    pub arxiv_categories: Vec<String>,

    #[serde(default = "default_arxiv_max_papers")]
    pub arxiv_max_papers: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            feed_dir: default_feed_dir(),
            ai_model_sources: default_ai_model_sources(),
            github_repos: default_github_repos(),
            github_max_repos: default_github_max_repos(),
            hf_model_tags: default_hf_model_tags(),
            hf_max_models: default_hf_max_models(),
            arxiv_categories: default_arxiv_categories(),
            arxiv_max_papers: default_arxiv_max_papers(),
        }
    }
}

fn default_feed_dir() -> PathBuf {
    PathBuf::from("data/feeds")
}
fn default_ai_model_sources() -> Vec<String> {
    ["openai", "anthropic", "google", "meta", "mistral", "cohere"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_github_repos() -> Vec<String> {
    [
        "huggingface/transformers",
        "openai/whisper",
        "facebookresearch/llama",
        "microsoft/DeepSpeed",
        "karpathy/nanoGPT",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_github_max_repos() -> usize {
    50
}
fn default_hf_model_tags() -> Vec<String> {
    ["transformers", "pytorch", "text-generation", "llm"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_hf_max_models() -> usize {
    100
}
fn default_arxiv_categories() -> Vec<String> {
    ["cs.AI", "cs.LG", "cs.CL", "cs.CV", "cs.NE"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_arxiv_max_papers() -> usize {
    50
}

/// `[analyzer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// How many entries each "top" insight lists.
    #[serde(default = "default_insight_top_n")]
    pub insight_top_n: usize,

    /// Include repository language statistics in insights.
    #[serde(default = "default_true")]
    pub enable_code_analysis: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            insight_top_n: default_insight_top_n(),
            enable_code_analysis: true,
        }
    }
}

fn default_insight_top_n() -> usize {
    3
}
fn default_true() -> bool {
    true
}

/// `[scheduler]` section.
///
/// Consumed by an external scheduler. `max_retries` and `retry_delay_secs`
/// are declared here but the pipeline core never retries a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_collector_schedule")]
    pub collector_schedule: String,

    #[serde(default = "default_analyzer_schedule")]
    pub analyzer_schedule: String,

    #[serde(default = "default_report_schedule")]
    pub report_schedule: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timezone: default_timezone(),
            collector_schedule: default_collector_schedule(),
            analyzer_schedule: default_analyzer_schedule(),
            report_schedule: default_report_schedule(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

fn default_timezone() -> String {
    "Asia/Shanghai".into()
}
fn default_collector_schedule() -> String {
    "0 6 * * *".into()
}
fn default_analyzer_schedule() -> String {
    "0 8 * * *".into()
}
fn default_report_schedule() -> String {
    "0 10 * * *".into()
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    300
}

/// `[memory]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Upper bound on stored entries; older entries are pruned first.
    #[serde(default = "default_max_memory_items")]
    pub max_memory_items: usize,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: default_db_path(),
            max_memory_items: default_max_memory_items(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/memory/memory.db")
}
fn default_max_memory_items() -> usize {
    10_000
}
fn default_retention_days() -> u32 {
    90
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_true")]
    pub enable_collection: bool,

    #[serde(default = "default_true")]
    pub enable_analysis: bool,

    #[serde(default = "default_true")]
    pub enable_reports: bool,

    /// Cap on structural analyses per run.
    #[serde(default = "default_max_model_analyses")]
    pub max_model_analyses: usize,

    /// Collected slot whose hub models feed the structural analyzer.
    #[serde(default = "default_structural_source")]
    pub structural_source: String,

    #[serde(default)]
    pub report_format: ReportFormat,

    /// Per-collector timeout. Unset means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_collection: true,
            enable_analysis: true,
            enable_reports: true,
            max_model_analyses: default_max_model_analyses(),
            structural_source: default_structural_source(),
            report_format: ReportFormat::default(),
            collection_timeout_secs: None,
        }
    }
}

fn default_max_model_analyses() -> usize {
    5
}
fn default_structural_source() -> String {
    "hf_models".into()
}

impl AppConfig {
    /// Create the data, reports, feed and memory directories.
    pub fn ensure_directories(&self) -> Result<()> {
        let mut dirs = vec![
            self.general.data_dir.clone(),
            self.general.reports_dir.clone(),
            self.collector.feed_dir.clone(),
        ];
        if self.memory.enabled {
            if let Some(parent) = self.memory.db_path.parent() {
                dirs.push(parent.to_path_buf());
            }
        }

        for dir in dirs.iter().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| AiInsightError::io(dir, e))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pipeline options (runtime, derived from config)
// ---------------------------------------------------------------------------

/// Coordinator options derived from the `[pipeline]` and `[scheduler]` sections.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub enable_collection: bool,
    pub enable_analysis: bool,
    pub enable_reports: bool,
    pub max_model_analyses: usize,
    pub structural_source: String,
    pub report_format: ReportFormat,
    pub collection_timeout_secs: Option<u64>,
    /// Declared for a future scheduling layer; not consulted by the core.
    pub max_retries: u32,
    /// Declared for a future scheduling layer; not consulted by the core.
    pub retry_delay_secs: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            enable_collection: config.pipeline.enable_collection,
            enable_analysis: config.pipeline.enable_analysis,
            enable_reports: config.pipeline.enable_reports,
            max_model_analyses: config.pipeline.max_model_analyses,
            structural_source: config.pipeline.structural_source.clone(),
            report_format: config.pipeline.report_format,
            collection_timeout_secs: config.pipeline.collection_timeout_secs,
            max_retries: config.scheduler.max_retries,
            retry_delay_secs: config.scheduler.retry_delay_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.aiinsight/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AiInsightError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.aiinsight/aiinsight.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk and apply environment overrides.
/// Uses defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if path.exists() {
        return load_config_at(&path);
    }

    tracing::debug!(?path, "config file not found, using defaults");
    let mut config = AppConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config)?;
    Ok(config)
}

/// Load the application config from `path`, apply environment overrides and
/// validate it. The file must exist.
pub fn load_config_at(path: &Path) -> Result<AppConfig> {
    let mut config = load_config_from(path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config)?;
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AiInsightError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| AiInsightError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Apply `AI_INSIGHT_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());

    if let Some(dir) = var("DATA_DIR") {
        config.general.data_dir = PathBuf::from(dir);
    }
    if let Some(dir) = var("REPORTS_DIR") {
        config.general.reports_dir = PathBuf::from(dir);
    }
    if let Some(dir) = var("FEED_DIR") {
        config.collector.feed_dir = PathBuf::from(dir);
    }
}

/// Reject option combinations the pipeline cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.pipeline.max_model_analyses == 0 {
        return Err(AiInsightError::config(
            "pipeline.max_model_analyses must be at least 1",
        ));
    }
    if config.pipeline.structural_source.trim().is_empty() {
        return Err(AiInsightError::config(
            "pipeline.structural_source must name a collected slot",
        ));
    }
    if config.pipeline.collection_timeout_secs == Some(0) {
        return Err(AiInsightError::config(
            "pipeline.collection_timeout_secs must be positive when set",
        ));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AiInsightError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AiInsightError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AiInsightError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("feed_dir"));
        assert!(toml_str.contains("max_model_analyses = 5"));
        assert!(toml_str.contains("report_format = \"json\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.pipeline.max_model_analyses, 5);
        assert_eq!(parsed.scheduler.max_retries, 3);
        assert_eq!(parsed.memory.retention_days, 90);
        assert!(parsed.pipeline.collection_timeout_secs.is_none());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[pipeline]
max_model_analyses = 2
enable_reports = false
collection_timeout_secs = 30

[collector]
hf_max_models = 10
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.pipeline.max_model_analyses, 2);
        assert!(!config.pipeline.enable_reports);
        assert!(config.pipeline.enable_analysis);
        assert_eq!(config.pipeline.structural_source, "hf_models");
        assert_eq!(config.collector.hf_max_models, 10);
        assert_eq!(config.collector.arxiv_max_papers, 50);
    }

    #[test]
    fn pipeline_options_from_app_config() {
        let app = AppConfig::default();
        let opts = PipelineOptions::from(&app);
        assert_eq!(opts.max_model_analyses, 5);
        assert_eq!(opts.structural_source, "hf_models");
        assert_eq!(opts.max_retries, 3);
        assert_eq!(opts.retry_delay_secs, 300);
        assert_eq!(opts.report_format, ReportFormat::Json);
    }

    #[test]
    fn env_overrides_apply_with_prefix() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            "AI_INSIGHT_FEED_DIR" => Some("/srv/feeds".into()),
            "AI_INSIGHT_REPORTS_DIR" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.collector.feed_dir, PathBuf::from("/srv/feeds"));
        assert_eq!(config.general.reports_dir, PathBuf::from("reports"));
    }

    #[test]
    fn validation_rejects_bad_pipeline_options() {
        let mut config = AppConfig::default();
        assert!(validate_config(&config).is_ok());

        config.pipeline.max_model_analyses = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_model_analyses"));

        config.pipeline.max_model_analyses = 5;
        config.pipeline.collection_timeout_secs = Some(0);
        assert!(validate_config(&config).is_err());
    }
}
