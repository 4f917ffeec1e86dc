use crate::chain::ChainIndex;
use crate::config;
use crate::error::{ChainError, Result};
use crate::models::IndexSymbol;
use crate::nse_client::NSEClient;
use crate::processor::{build_view, NormalizedChainView};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::{info, warn};

/// Everything one refresh cycle produced
#[derive(Debug, Clone, Serialize)]
pub struct ChainSnapshot {
    pub index: IndexSymbol,
    pub chain: ChainIndex,
    pub timestamp: Option<String>,
    pub underlying_value: Option<f64>,
    pub fetched_at: DateTime<Local>,
}

impl ChainSnapshot {
    pub fn view(&self, expiry: Option<&str>) -> Result<NormalizedChainView> {
        let expiry = match expiry {
            Some(e) => e,
            None => self.chain.default_expiry().ok_or_else(|| ChainError::NotFound {
                expiry: "<default>".to_string(),
            })?,
        };
        build_view(&self.chain, expiry)
    }
}

/// Backoff used by callers that want to retry transient failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_delay_ms: u64,
    pub factor: u64,
    pub max_delay: Duration,
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: config::RETRY_BASE_DELAY_MS,
            factor: config::RETRY_FACTOR,
            max_delay: Duration::from_secs(config::RETRY_MAX_DELAY_SECS),
            max_attempts: config::RETRY_MAX_ATTEMPTS,
        }
    }
}

/// Fetch and build one snapshot for `index`
pub async fn load_snapshot(client: &NSEClient, index: IndexSymbol) -> Result<ChainSnapshot> {
    let raw = client.fetch(index).await?;
    Ok(ChainSnapshot {
        index,
        timestamp: raw.records.timestamp.clone(),
        underlying_value: raw.underlying_value(),
        chain: ChainIndex::build(&raw),
        fetched_at: Local::now(),
    })
}

/// Like `load_snapshot`, retrying transport failures with exponential backoff
pub async fn load_snapshot_with_retry(
    client: &NSEClient,
    index: IndexSymbol,
    policy: RetryPolicy,
) -> Result<ChainSnapshot> {
    let backoff = ExponentialBackoff::from_millis(policy.base_delay_ms)
        .factor(policy.factor)
        .max_delay(policy.max_delay)
        // the first call is not a retry
        .take(policy.max_attempts.saturating_sub(1));

    RetryIf::spawn(
        backoff,
        move || async move {
            load_snapshot(client, index).await.inspect_err(|e| {
                if e.is_transient() {
                    warn!(index = %index, error = %e, "refresh failed, will retry");
                }
            })
        },
        ChainError::is_transient,
    )
    .await
}

/// Holds the current chain for one selected index. Each successful refresh
/// replaces the snapshot wholesale; a failed one leaves the old one in place.
pub struct ChainSession {
    client: Arc<NSEClient>,
    index: IndexSymbol,
    current: Option<Arc<ChainSnapshot>>,
}

impl ChainSession {
    pub fn new(client: Arc<NSEClient>, index: IndexSymbol) -> Self {
        Self {
            client,
            index,
            current: None,
        }
    }

    pub fn index(&self) -> IndexSymbol {
        self.index
    }

    /// Switch index; the old index's snapshot no longer applies
    pub fn select_index(&mut self, index: IndexSymbol) {
        if self.index != index {
            self.index = index;
            self.current = None;
        }
    }

    pub fn current(&self) -> Option<Arc<ChainSnapshot>> {
        self.current.clone()
    }

    pub async fn refresh(&mut self) -> Result<Arc<ChainSnapshot>> {
        let snapshot = load_snapshot(&self.client, self.index).await?;
        Ok(self.replace(snapshot))
    }

    pub async fn refresh_with_retry(&mut self, policy: RetryPolicy) -> Result<Arc<ChainSnapshot>> {
        let snapshot = load_snapshot_with_retry(&self.client, self.index, policy).await?;
        Ok(self.replace(snapshot))
    }

    /// Refresh every `interval` until `shutdown` resolves, calling `on_cycle`
    /// after each attempt. Shutdown also cancels a refresh that is in flight.
    pub async fn watch<S, F>(
        &mut self,
        interval: Duration,
        policy: RetryPolicy,
        shutdown: S,
        mut on_cycle: F,
    ) where
        S: Future<Output = ()>,
        F: FnMut(&ChainSession, Option<&ChainError>),
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => break,
            }

            let result = tokio::select! {
                result = self.refresh_with_retry(policy) => result,
                _ = &mut shutdown => break,
            };
            on_cycle(self, result.err().as_ref());
        }

        info!(index = %self.index, "watch stopped");
    }

    /// View of the current snapshot; NotFound if nothing was loaded yet
    pub fn view(&self, expiry: Option<&str>) -> Result<NormalizedChainView> {
        match &self.current {
            Some(snapshot) => snapshot.view(expiry),
            None => Err(ChainError::NotFound {
                expiry: expiry.unwrap_or("<default>").to_string(),
            }),
        }
    }

    fn replace(&mut self, snapshot: ChainSnapshot) -> Arc<ChainSnapshot> {
        info!(
            index = %snapshot.index,
            expiries = snapshot.chain.expiries().len(),
            "chain snapshot replaced"
        );
        let snapshot = Arc::new(snapshot);
        self.current = Some(Arc::clone(&snapshot));
        snapshot
    }
}
