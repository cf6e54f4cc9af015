//! Core domain types: collected records, stage payloads, and run identifiers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ReportFormat
// ---------------------------------------------------------------------------

/// Output format requested from a report generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
    Html,
    Ppt,
}

impl ReportFormat {
    /// File extension for this format (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Ppt => "pptx",
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Ppt => "ppt",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Collected records
// ---------------------------------------------------------------------------

/// A model announced by an AI vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiModel {
    pub name: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A source code repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name`.
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub stars: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A model published on a model hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubModel {
    /// Hub identifier, e.g. `meta-llama/Llama-3.1-8B`.
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Task the model is tagged for, e.g. `text-generation`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_tag: Option<String>,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A research paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub arxiv_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
}

/// Any record a collector can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    AiModel(AiModel),
    Repository(Repository),
    HubModel(HubModel),
    Paper(Paper),
}

impl Item {
    /// Short human-readable label used in logs.
    pub fn label(&self) -> &str {
        match self {
            Self::AiModel(m) => &m.name,
            Self::Repository(r) => &r.full_name,
            Self::HubModel(m) => &m.model_id,
            Self::Paper(p) => &p.title,
        }
    }

    /// Returns the hub model if this item is one.
    pub fn as_hub_model(&self) -> Option<&HubModel> {
        match self {
            Self::HubModel(m) => Some(m),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CollectedData
// ---------------------------------------------------------------------------

/// Output of the collect stage: one slot per configured source.
///
/// Slots are present even when their source failed; a failed source simply
/// leaves its slot empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectedData {
    slots: BTreeMap<String, Vec<Item>>,
}

impl CollectedData {
    /// Create a mapping with an empty slot for each name.
    pub fn with_slots<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slots: names.into_iter().map(|n| (n.into(), Vec::new())).collect(),
        }
    }

    /// Replace the contents of a slot, creating it if needed.
    pub fn set_slot(&mut self, name: impl Into<String>, items: Vec<Item>) {
        self.slots.insert(name.into(), items);
    }

    /// Items in a slot, if the slot exists.
    pub fn slot(&self, name: &str) -> Option<&[Item]> {
        self.slots.get(name).map(Vec::as_slice)
    }

    /// Slot names in sorted order.
    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Iterate over `(slot, items)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Item])> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Item count per slot.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.slots.iter().map(|(k, v)| (k.clone(), v.len())).collect()
    }

    /// Total number of items across all slots.
    pub fn total_items(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    /// `true` when no slot holds any item.
    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }
}

// ---------------------------------------------------------------------------
// Analysis payloads
// ---------------------------------------------------------------------------

/// A single finding produced by the insight analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Slot or theme the insight is about (e.g. `repos`, `overview`).
    pub category: String,
    pub title: String,
    pub detail: String,
}

/// Result of analyzing a whole collect-stage output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub generated_at: DateTime<Utc>,
    pub insights: Vec<Insight>,
    /// Item count per slot at analysis time.
    #[serde(default)]
    pub totals: BTreeMap<String, usize>,
}

/// Input of the structural analyzer: one model to inspect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    /// Raw model configuration, when known.
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl From<&HubModel> for ModelDescriptor {
    fn from(model: &HubModel) -> Self {
        Self {
            name: model.model_id.clone(),
            provider: model.author.clone(),
            model_type: model.pipeline_tag.clone(),
            config: serde_json::Map::new(),
        }
    }
}

/// Structural analysis of a single model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAnalysis {
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    /// Architecture family, e.g. `decoder-only transformer`.
    pub architecture: String,
    /// Parameter count in billions, when it can be derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_scale_b: Option<f64>,
    #[serde(default)]
    pub highlights: Vec<String>,
}
