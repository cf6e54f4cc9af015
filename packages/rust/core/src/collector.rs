//! Collector capability trait and the [`CollectorUnit`] lifecycle wrapper.

use std::panic::AssertUnwindSafe;
use std::sync::{PoisonError, RwLock};
use std::time::Instant;

use aiinsight_shared::Result;
use async_trait::async_trait;
use futures::FutureExt;
use tracing::{error, info, instrument, warn};

use crate::envelope::{CollectionResult, UnitStatus, panic_message};

/// A data source. Implementations supply only their domain body; lifecycle,
/// status tracking and failure isolation live in [`CollectorUnit`].
#[async_trait]
pub trait Collector: Send + Sync {
    /// Unit name used in logs, errors and envelope provenance.
    fn name(&self) -> &str;

    /// Precondition checked before every run. `false` fails the run without
    /// invoking [`Collector::collect`].
    async fn validate_config(&self) -> bool;

    /// Fetch records. Non-fatal problems go in the result's `errors`.
    async fn collect(&self) -> Result<CollectionResult>;

    /// Release held resources.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Owns a [`Collector`], the slot its data lands in, and its last status.
pub struct CollectorUnit {
    slot: String,
    inner: Box<dyn Collector>,
    status: RwLock<UnitStatus>,
}

impl CollectorUnit {
    pub fn new(slot: impl Into<String>, collector: Box<dyn Collector>) -> Self {
        Self {
            slot: slot.into(),
            inner: collector,
            status: RwLock::new(UnitStatus::Pending),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Key of the collected-data slot this unit fills.
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Status observed at the end of the most recent run.
    pub fn status(&self) -> UnitStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: UnitStatus) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Run the collector. Never fails and never panics: every error and
    /// panic from the body becomes a `Failed` result.
    #[instrument(skip_all, fields(collector = %self.name()))]
    pub async fn run(&self) -> CollectionResult {
        let start = Instant::now();
        let name = self.name().to_string();
        self.set_status(UnitStatus::Running);
        info!("collector started");

        let body = async {
            if !self.inner.validate_config().await {
                return CollectionResult::failed(&name, format!("Invalid configuration for {name}"));
            }
            match self.inner.collect().await {
                Ok(result) => result.settle(&name),
                Err(e) => CollectionResult::failed(&name, e.to_string()),
            }
        };

        let result = match AssertUnwindSafe(body).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => CollectionResult::failed(&name, panic_message(panic.as_ref())),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match result.status {
            UnitStatus::Failed => error!(errors = ?result.errors, duration_ms, "collector failed"),
            UnitStatus::Partial => warn!(
                items = result.items_count,
                errors = result.errors.len(),
                duration_ms,
                "collector finished with errors"
            ),
            _ => info!(items = result.items_count, duration_ms, "collector finished"),
        }

        self.set_status(result.status);
        result
    }

    /// Record a failure decided outside the body (e.g. a timeout).
    pub(crate) fn fail_with(&self, message: impl Into<String>) -> CollectionResult {
        let result = CollectionResult::failed(self.name(), message);
        error!(collector = %self.name(), errors = ?result.errors, "collector failed");
        self.set_status(UnitStatus::Failed);
        result
    }

    /// Invoke the collector's teardown hook.
    pub async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}

impl std::fmt::Debug for CollectorUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorUnit")
            .field("name", &self.name())
            .field("slot", &self.slot)
            .field("status", &self.status())
            .finish()
    }
}
