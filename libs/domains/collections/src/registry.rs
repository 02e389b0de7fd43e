//! Process-wide table of in-flight and finished transfer operations.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Operation, OperationStatus};

/// How long a finished operation stays visible to pollers before eviction.
const DEFAULT_RETENTION: Duration = Duration::from_secs(300);

/// Registry of transfer operations, shared between the engine (writer) and
/// the progress endpoint (reader).
///
/// Cloning is cheap and shares the underlying table. Reads always observe a
/// whole-record snapshot: `processed` and `status` can never be torn apart
/// because every access clones the record under one lock acquisition.
///
/// Records are mutated only by the engine that owns the operation; terminal
/// records are immutable and are evicted after a retention delay so pollers
/// have a window to observe the final state.
#[derive(Clone)]
pub struct OperationRegistry {
    operations: Arc<RwLock<HashMap<Uuid, Operation>>>,
    retention: Duration,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            operations: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Allocate and store a new in-progress operation, returning its id.
    pub async fn create(&self, source_id: Uuid, target_id: Uuid, total: u64) -> Uuid {
        let operation = Operation {
            id: Uuid::new_v4(),
            source_id,
            target_id,
            total,
            processed: 0,
            status: OperationStatus::InProgress,
            created_at: Utc::now(),
        };
        let id = operation.id;

        let mut operations = self.operations.write().await;
        operations.insert(id, operation);

        tracing::debug!(operation_id = %id, total, "Registered transfer operation");
        id
    }

    /// Consistent snapshot of one operation, or None if unknown/evicted.
    pub async fn get(&self, id: Uuid) -> Option<Operation> {
        let operations = self.operations.read().await;
        operations.get(&id).cloned()
    }

    /// Publish a new processed count.
    ///
    /// `processed` is monotonic: stale or out-of-order values are ignored,
    /// as are updates to terminal records. The count is clamped to `total`.
    pub async fn record_progress(&self, id: Uuid, processed: u64) {
        let mut operations = self.operations.write().await;
        if let Some(operation) = operations.get_mut(&id) {
            if !operation.status.is_terminal() && processed > operation.processed {
                operation.processed = processed.min(operation.total);
            }
        }
    }

    /// Mark an operation successfully finished.
    ///
    /// Sets `processed = total` and the terminal status in one update, so a
    /// poller can never see `completed` with a partial count.
    pub async fn complete(&self, id: Uuid) {
        {
            let mut operations = self.operations.write().await;
            if let Some(operation) = operations.get_mut(&id) {
                if !operation.status.is_terminal() {
                    operation.processed = operation.total;
                    operation.status = OperationStatus::Completed;
                }
            }
        }
        self.schedule_eviction(id);
    }

    /// Mark an operation failed, keeping `processed` at its last committed
    /// value.
    pub async fn fail(&self, id: Uuid) {
        {
            let mut operations = self.operations.write().await;
            if let Some(operation) = operations.get_mut(&id) {
                if !operation.status.is_terminal() {
                    operation.status = OperationStatus::Error;
                }
            }
        }
        self.schedule_eviction(id);
    }

    fn schedule_eviction(&self, id: Uuid) {
        let operations = Arc::clone(&self.operations);
        let retention = self.retention;
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            let removed = operations.write().await.remove(&id).is_some();
            if removed {
                tracing::debug!(operation_id = %id, "Evicted finished transfer operation");
            }
        });
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.operations.read().await.len()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = OperationRegistry::new();
        let source = Uuid::new_v4();
        let target = Uuid::new_v4();

        let id = registry.create(source, target, 42).await;
        let operation = registry.get(id).await.unwrap();

        assert_eq!(operation.source_id, source);
        assert_eq!(operation.target_id, target);
        assert_eq!(operation.total, 42);
        assert_eq!(operation.processed, 0);
        assert_eq!(operation.status, OperationStatus::InProgress);
    }

    #[tokio::test]
    async fn test_get_unknown_returns_none() {
        let registry = OperationRegistry::new();
        assert!(registry.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let registry = OperationRegistry::new();
        let id = registry.create(Uuid::new_v4(), Uuid::new_v4(), 100).await;

        registry.record_progress(id, 40).await;
        registry.record_progress(id, 20).await; // stale, ignored
        assert_eq!(registry.get(id).await.unwrap().processed, 40);

        registry.record_progress(id, 60).await;
        assert_eq!(registry.get(id).await.unwrap().processed, 60);
    }

    #[tokio::test]
    async fn test_progress_clamped_to_total() {
        let registry = OperationRegistry::new();
        let id = registry.create(Uuid::new_v4(), Uuid::new_v4(), 10).await;

        registry.record_progress(id, 25).await;
        assert_eq!(registry.get(id).await.unwrap().processed, 10);
    }

    #[tokio::test]
    async fn test_complete_sets_processed_to_total() {
        let registry = OperationRegistry::new();
        let id = registry.create(Uuid::new_v4(), Uuid::new_v4(), 10).await;

        registry.record_progress(id, 7).await;
        registry.complete(id).await;

        let operation = registry.get(id).await.unwrap();
        assert_eq!(operation.status, OperationStatus::Completed);
        assert_eq!(operation.processed, 10);
        assert_eq!(operation.progress_percent(), 100.0);
    }

    #[tokio::test]
    async fn test_fail_keeps_last_committed_count() {
        let registry = OperationRegistry::new();
        let id = registry.create(Uuid::new_v4(), Uuid::new_v4(), 100).await;

        registry.record_progress(id, 40).await;
        registry.fail(id).await;

        let operation = registry.get(id).await.unwrap();
        assert_eq!(operation.status, OperationStatus::Error);
        assert_eq!(operation.processed, 40);
    }

    #[tokio::test]
    async fn test_terminal_states_are_immutable() {
        let registry = OperationRegistry::new();
        let id = registry.create(Uuid::new_v4(), Uuid::new_v4(), 10).await;

        registry.fail(id).await;
        registry.record_progress(id, 9).await;
        registry.complete(id).await;

        let operation = registry.get(id).await.unwrap();
        assert_eq!(operation.status, OperationStatus::Error);
        assert_eq!(operation.processed, 0);
    }

    #[tokio::test]
    async fn test_terminal_operations_evicted_after_retention() {
        let registry = OperationRegistry::with_retention(Duration::from_millis(20));
        let id = registry.create(Uuid::new_v4(), Uuid::new_v4(), 1).await;

        registry.complete(id).await;
        assert!(registry.get(id).await.is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(registry.get(id).await.is_none());
        assert_eq!(registry.len().await, 0);
    }
}
