//! Key/value memory port used for run history.

use std::time::Duration;

use aiinsight_shared::Result;
use aiinsight_storage::Storage;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Sink for stage summaries (`last_collection`, `last_analysis`).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn store(&self, key: &str, value: serde_json::Value) -> Result<()>;
}

#[async_trait]
impl MemoryStore for Storage {
    async fn store(&self, key: &str, value: serde_json::Value) -> Result<()> {
        Storage::store(self, key, &value).await.map(|_| ())
    }
}

/// Upper bound on a single stage-summary write.
pub(crate) const MEMORY_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Write `value` under `key`, logging failures instead of returning them.
/// A store that does not answer within `limit` is abandoned so the stage
/// can finish.
pub(crate) async fn remember(
    store: Option<&dyn MemoryStore>,
    key: &str,
    value: serde_json::Value,
    limit: Duration,
) {
    let Some(store) = store else {
        return;
    };
    match tokio::time::timeout(limit, store.store(key, value)).await {
        Ok(Ok(())) => debug!(key, "memory updated"),
        Ok(Err(e)) => warn!(key, error = %e, "memory write failed, continuing"),
        Err(_) => warn!(key, timeout_ms = limit.as_millis() as u64, "memory write timed out, continuing"),
    }
}
