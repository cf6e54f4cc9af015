//! Result envelopes returned by every pipeline unit.

use std::any::Any;

use aiinsight_shared::Item;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a unit invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
    Partial,
}

impl UnitStatus {
    /// `true` once a run has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Partial)
    }

    /// `true` when the run produced a payload downstream stages may use.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Success | Self::Partial)
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Outcome of one unit run: status, optional payload, and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<P> {
    pub status: UnitStatus,
    pub payload: Option<P>,
    /// Error strings in the order they occurred.
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub produced_at: DateTime<Utc>,
    /// Name of the unit that produced this envelope. Set by the unit wrapper.
    #[serde(default)]
    pub source: String,
}

/// Envelope produced by analysis units.
pub type AnalysisResult<P> = Envelope<P>;

impl<P> Envelope<P> {
    /// Payload plus any non-fatal errors: `Success` when `errors` is empty,
    /// `Partial` otherwise.
    pub fn from_outcome(payload: P, errors: Vec<String>) -> Self {
        let status = if errors.is_empty() {
            UnitStatus::Success
        } else {
            UnitStatus::Partial
        };
        Self {
            status,
            payload: Some(payload),
            errors,
            metadata: serde_json::Map::new(),
            produced_at: Utc::now(),
            source: String::new(),
        }
    }

    pub fn success(payload: P) -> Self {
        Self::from_outcome(payload, Vec::new())
    }

    /// A failed envelope with no payload and `message` as its only error.
    pub fn failed(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: UnitStatus::Failed,
            payload: None,
            errors: vec![message.into()],
            metadata: serde_json::Map::new(),
            produced_at: Utc::now(),
            source: source.into(),
        }
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Stamp provenance and reconcile the status with payload and errors.
    pub(crate) fn settle(mut self, source: &str) -> Self {
        self.source = source.to_string();
        let has_payload = self.payload.is_some() && self.status != UnitStatus::Failed;
        self.status = settled_status(has_payload, &mut self.errors, source);
        if self.status == UnitStatus::Failed {
            self.payload = None;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// CollectionResult
// ---------------------------------------------------------------------------

/// Outcome of one collector run. `data` is always present, empty on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub status: UnitStatus,
    pub data: Vec<Item>,
    /// Equals `data.len()` unless the collector overrides it.
    pub items_count: usize,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub collected_at: DateTime<Utc>,
    #[serde(default)]
    pub source: String,
}

impl CollectionResult {
    /// Collected items plus any non-fatal errors.
    pub fn new(data: Vec<Item>, errors: Vec<String>) -> Self {
        let status = if errors.is_empty() {
            UnitStatus::Success
        } else {
            UnitStatus::Partial
        };
        Self {
            status,
            items_count: data.len(),
            data,
            errors,
            metadata: serde_json::Map::new(),
            collected_at: Utc::now(),
            source: String::new(),
        }
    }

    pub fn failed(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: UnitStatus::Failed,
            data: Vec::new(),
            items_count: 0,
            errors: vec![message.into()],
            metadata: serde_json::Map::new(),
            collected_at: Utc::now(),
            source: source.into(),
        }
    }

    /// Report a count different from `data.len()` (e.g. items seen upstream).
    pub fn with_items_count(mut self, count: usize) -> Self {
        self.items_count = count;
        self
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub(crate) fn settle(mut self, source: &str) -> Self {
        self.source = source.to_string();
        let has_payload = self.status != UnitStatus::Failed;
        self.status = settled_status(has_payload, &mut self.errors, source);
        if self.status == UnitStatus::Failed {
            self.data.clear();
            self.items_count = 0;
        }
        self
    }
}

/// Final status for a body that returned normally.
///
/// No usable payload means `Failed` (with at least one error); otherwise any
/// error downgrades to `Partial`.
fn settled_status(has_payload: bool, errors: &mut Vec<String>, source: &str) -> UnitStatus {
    if !has_payload {
        if errors.is_empty() {
            errors.push(format!("{source} produced no payload"));
        }
        UnitStatus::Failed
    } else if errors.is_empty() {
        UnitStatus::Success
    } else {
        UnitStatus::Partial
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into());
    format!("panicked: {detail}")
}
