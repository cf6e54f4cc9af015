//! Analyzer capability trait and the [`AnalyzerUnit`] lifecycle wrapper.

use std::panic::AssertUnwindSafe;
use std::sync::{PoisonError, RwLock};
use std::time::Instant;

use aiinsight_shared::Result;
use async_trait::async_trait;
use futures::FutureExt;
use tracing::{error, info, instrument, warn};

use crate::envelope::{AnalysisResult, UnitStatus, panic_message};

/// Turns an input into an analysis payload.
#[async_trait]
pub trait Analyzer: Send + Sync {
    type Input: Send + Sync;
    type Output: Send;

    /// Unit name used in logs, errors and envelope provenance.
    fn name(&self) -> &str;

    async fn analyze(&self, input: &Self::Input) -> Result<AnalysisResult<Self::Output>>;
}

/// Owns an [`Analyzer`] and its last observed status.
pub struct AnalyzerUnit<I, O> {
    inner: Box<dyn Analyzer<Input = I, Output = O>>,
    status: RwLock<UnitStatus>,
}

impl<I, O> AnalyzerUnit<I, O>
where
    I: Send + Sync,
    O: Send,
{
    pub fn new(analyzer: impl Analyzer<Input = I, Output = O> + 'static) -> Self {
        Self {
            inner: Box::new(analyzer),
            status: RwLock::new(UnitStatus::Pending),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn status(&self) -> UnitStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: UnitStatus) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Analyze `input`. Errors and panics from the body become a `Failed`
    /// envelope; nothing propagates to the caller.
    #[instrument(skip_all, fields(analyzer = %self.name()))]
    pub async fn run(&self, input: &I) -> AnalysisResult<O> {
        let start = Instant::now();
        let name = self.name().to_string();
        self.set_status(UnitStatus::Running);
        info!("analyzer started");

        let body = async {
            match self.inner.analyze(input).await {
                Ok(envelope) => envelope.settle(&name),
                Err(e) => AnalysisResult::failed(&name, e.to_string()),
            }
        };

        let result = match AssertUnwindSafe(body).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => AnalysisResult::failed(&name, panic_message(panic.as_ref())),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match result.status {
            UnitStatus::Failed => error!(errors = ?result.errors, duration_ms, "analyzer failed"),
            UnitStatus::Partial => {
                warn!(errors = ?result.errors, duration_ms, "analyzer finished with errors")
            }
            _ => info!(duration_ms, "analyzer finished"),
        }

        self.set_status(result.status);
        result
    }
}
