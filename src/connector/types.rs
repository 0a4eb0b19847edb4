//! Connector trait and listing context

use crate::asset::DataAsset;
use crate::batch::{BatchSpec, BatchSpecTemplate};
use crate::error::{Error, Result};
use crate::partition::{Partition, Partitioner};
use crate::types::ConnectorFamily;
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Cancellation
// ============================================================================

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation shared between a caller and in-flight listings
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<CancelState>,
}

impl CancellationToken {
    /// Create a new, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every listing observing this token
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether `cancel` has been called
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag check so a concurrent cancel is not missed
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

// ============================================================================
// List Context
// ============================================================================

/// Deadline and cancellation passed through enumeration I/O
#[derive(Debug, Clone, Default)]
pub struct ListContext {
    /// Maximum time a single listing may take
    pub deadline: Option<Duration>,
    /// Cancellation token
    pub cancel: CancellationToken,
}

impl ListContext {
    /// Context with no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deadline
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Use an existing cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run a listing future under this context's deadline and cancellation
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let guarded = async {
            tokio::select! {
                result = fut => result,
                () = self.cancel.cancelled() => Err(Error::Cancelled),
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, guarded)
                .await
                .map_err(|_| Error::Timeout {
                    timeout_ms: deadline.as_millis() as u64,
                })?,
            None => guarded.await,
        }
    }
}

// ============================================================================
// Data Connector
// ============================================================================

/// Enumerates candidate locations for an asset and extracts partition keys
#[async_trait]
pub trait DataConnector: Send + Sync {
    /// Kind of store behind this connector
    fn family(&self) -> ConnectorFamily;

    /// Human-readable description of the store (for logging)
    fn describe(&self) -> String;

    /// Check that the store is reachable
    async fn check(&self) -> Result<()>;

    /// List every partition of `asset` visible through `partitioner`
    ///
    /// Candidates that do not match are dropped silently. The result is in
    /// lexicographic order of location so that ties in later sorting are
    /// deterministic.
    async fn list_partitions(
        &self,
        asset: &DataAsset,
        partitioner: Option<&Partitioner>,
        ctx: &ListContext,
    ) -> Result<Vec<Partition>>;

    /// Build the batch spec for one enumerated partition
    fn build_batch_spec(&self, template: &BatchSpecTemplate, partition: Partition) -> BatchSpec {
        template.build(partition)
    }
}
