//! Asynchronous bulk transfer of memberships between two collections.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

use crate::dedup;
use crate::error::{CollectionError, CollectionResult};
use crate::models::{TransferMode, TransferScope};
use crate::registry::OperationRegistry;
use crate::repository::CollectionRepository;

/// Tuning knobs for the transfer engine.
#[derive(Debug, Clone, Copy)]
pub struct TransferConfig {
    /// Companies handled per read-dedup-write unit. Larger batches amortize
    /// per-write overhead; smaller ones give finer-grained progress.
    pub batch_size: usize,

    /// Pause between batches. Caps sustained write pressure on the store;
    /// zero is valid when the pool already rate-limits.
    pub throttle: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            batch_size: 200,
            throttle: Duration::from_millis(100),
        }
    }
}

/// Engine running one background task per transfer operation.
///
/// `start` validates the request, registers the operation, and returns its
/// id without waiting for any batch to complete. The caller polls the
/// [`OperationRegistry`] for progress; nothing is ever awaited on the
/// request path.
///
/// Multiple operations may run concurrently against the same store. The
/// per-batch dedup check is only an optimization; the store's uniqueness
/// constraint on (collection, company) is what actually prevents duplicate
/// rows when two operations race into the same target.
pub struct TransferEngine<R> {
    repository: Arc<R>,
    registry: OperationRegistry,
    config: TransferConfig,
}

impl<R> Clone for TransferEngine<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            registry: self.registry.clone(),
            config: self.config,
        }
    }
}

impl<R: CollectionRepository + 'static> TransferEngine<R> {
    pub fn new(repository: Arc<R>, registry: OperationRegistry, config: TransferConfig) -> Self {
        Self {
            repository,
            registry,
            config,
        }
    }

    /// Start a transfer and return its operation id.
    ///
    /// Fails synchronously (no operation is created) when the request is
    /// malformed or either collection does not exist. Everything that can go
    /// wrong after this point is reported through the operation's status.
    pub async fn start(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        scope: TransferScope,
        mode: TransferMode,
    ) -> CollectionResult<Uuid> {
        if source_id == target_id {
            return Err(CollectionError::InvalidTransfer(
                "source and target collections must differ".to_string(),
            ));
        }

        if let TransferScope::Companies(ids) = &scope {
            if ids.is_empty() {
                return Err(CollectionError::InvalidTransfer(
                    "company set must not be empty".to_string(),
                ));
            }
        }

        self.repository
            .get_collection(source_id)
            .await?
            .ok_or(CollectionError::CollectionNotFound(source_id))?;
        self.repository
            .get_collection(target_id)
            .await?
            .ok_or(CollectionError::CollectionNotFound(target_id))?;

        // The scope is fixed here: mutations of the source after this point
        // never change the operation's denominator.
        let total = match &scope {
            TransferScope::AllMembers => self.repository.count_members(source_id).await?,
            TransferScope::Companies(ids) => ids.len() as u64,
        };

        let operation_id = self.registry.create(source_id, target_id, total).await;

        tracing::info!(
            %operation_id, %source_id, %target_id, total, ?mode,
            "Starting collection transfer"
        );

        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(e) = engine
                .run(operation_id, source_id, target_id, &scope, mode, total)
                .await
            {
                tracing::error!(%operation_id, error = %e, "Collection transfer failed");
                engine.registry.fail(operation_id).await;
            }
        });

        Ok(operation_id)
    }

    /// Process the whole scope batch by batch.
    ///
    /// Any error aborts the remaining batches; the caller records the
    /// terminal `error` status with `processed` still at the last committed
    /// batch boundary.
    async fn run(
        &self,
        operation_id: Uuid,
        source_id: Uuid,
        target_id: Uuid,
        scope: &TransferScope,
        mode: TransferMode,
        total: u64,
    ) -> CollectionResult<()> {
        let mut processed: u64 = 0;

        while processed < total {
            let batch = self
                .next_batch(source_id, scope, mode, processed, total)
                .await?;
            if batch.is_empty() {
                // Source shrank under a snapshot count; nothing left to scan.
                break;
            }

            // A move of an explicit set only carries companies actually in
            // the source; a copy transfers the scope as given.
            let candidates: Vec<Uuid> = match (mode, scope) {
                (TransferMode::Move, TransferScope::Companies(_)) => {
                    let in_source = self
                        .repository
                        .list_members_among(source_id, &batch)
                        .await?;
                    batch.iter().copied().filter(|id| in_source.contains(id)).collect()
                }
                _ => batch.clone(),
            };

            let existing = self
                .repository
                .list_members_among(target_id, &candidates)
                .await?;
            let to_insert = dedup::missing_members(&candidates, &existing);

            if !to_insert.is_empty() {
                self.repository.add_members(target_id, &to_insert).await?;
            }

            if mode == TransferMode::Move && !candidates.is_empty() {
                self.repository
                    .remove_members(source_id, &candidates)
                    .await?;
            }

            // Progress tracks scope coverage, not write count: skipped
            // duplicates still advance the operation.
            processed += batch.len() as u64;
            self.registry.record_progress(operation_id, processed).await;

            tracing::debug!(
                %operation_id,
                processed,
                total,
                written = to_insert.len(),
                "Transferred batch"
            );

            if !self.config.throttle.is_zero() {
                sleep(self.config.throttle).await;
            }
        }

        self.registry.complete(operation_id).await;
        tracing::info!(%operation_id, total, "Collection transfer completed");
        Ok(())
    }

    async fn next_batch(
        &self,
        source_id: Uuid,
        scope: &TransferScope,
        mode: TransferMode,
        processed: u64,
        total: u64,
    ) -> CollectionResult<Vec<Uuid>> {
        // Never read past the snapshot window: companies added to the source
        // after start sort beyond it and must not join the scope.
        let limit = (self.config.batch_size as u64).min(total - processed);
        match scope {
            TransferScope::AllMembers => {
                // Moved rows leave the source as they are processed, so a
                // move always reads from the front; a copy pages forward.
                let offset = match mode {
                    TransferMode::Copy => processed,
                    TransferMode::Move => 0,
                };
                self.repository
                    .list_members(source_id, offset, limit)
                    .await
            }
            TransferScope::Companies(ids) => {
                let start = processed as usize;
                let end = (start + limit as usize).min(ids.len());
                Ok(ids[start..end].to_vec())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OperationStatus;
    use crate::repository::InMemoryCollectionRepository;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use crate::error::CollectionResult;
    use crate::models::{Collection, Company, Operation};
    use crate::repository::CollectionRepository;

    /// Wrapper around the in-memory repository that counts bulk writes and
    /// optionally fails after a fixed number of them.
    struct InstrumentedRepository {
        inner: InMemoryCollectionRepository,
        add_calls: AtomicUsize,
        fail_add_after: Option<usize>,
    }

    impl InstrumentedRepository {
        fn new(inner: InMemoryCollectionRepository) -> Self {
            Self {
                inner,
                add_calls: AtomicUsize::new(0),
                fail_add_after: None,
            }
        }

        fn failing_after(inner: InMemoryCollectionRepository, successful_writes: usize) -> Self {
            Self {
                inner,
                add_calls: AtomicUsize::new(0),
                fail_add_after: Some(successful_writes),
            }
        }

        fn bulk_writes(&self) -> usize {
            self.add_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CollectionRepository for InstrumentedRepository {
        async fn list_collections(&self) -> CollectionResult<Vec<Collection>> {
            self.inner.list_collections().await
        }

        async fn get_collection(&self, id: Uuid) -> CollectionResult<Option<Collection>> {
            self.inner.get_collection(id).await
        }

        async fn find_collection_by_name(
            &self,
            name: &str,
        ) -> CollectionResult<Option<Collection>> {
            self.inner.find_collection_by_name(name).await
        }

        async fn list_companies(
            &self,
            offset: u64,
            limit: u64,
        ) -> CollectionResult<(Vec<Company>, u64)> {
            self.inner.list_companies(offset, limit).await
        }

        async fn list_companies_in(
            &self,
            collection_id: Uuid,
            offset: u64,
            limit: u64,
        ) -> CollectionResult<(Vec<Company>, u64)> {
            self.inner.list_companies_in(collection_id, offset, limit).await
        }

        async fn count_members(&self, collection_id: Uuid) -> CollectionResult<u64> {
            self.inner.count_members(collection_id).await
        }

        async fn list_members(
            &self,
            collection_id: Uuid,
            offset: u64,
            limit: u64,
        ) -> CollectionResult<Vec<Uuid>> {
            self.inner.list_members(collection_id, offset, limit).await
        }

        async fn list_members_among(
            &self,
            collection_id: Uuid,
            company_ids: &[Uuid],
        ) -> CollectionResult<HashSet<Uuid>> {
            self.inner.list_members_among(collection_id, company_ids).await
        }

        async fn add_members(
            &self,
            collection_id: Uuid,
            company_ids: &[Uuid],
        ) -> CollectionResult<()> {
            let calls = self.add_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(limit) = self.fail_add_after {
                if calls > limit {
                    return Err(crate::error::CollectionError::Store(
                        "injected write failure".to_string(),
                    ));
                }
            }
            self.inner.add_members(collection_id, company_ids).await
        }

        async fn remove_members(
            &self,
            collection_id: Uuid,
            company_ids: &[Uuid],
        ) -> CollectionResult<u64> {
            self.inner.remove_members(collection_id, company_ids).await
        }
    }

    fn quick_config(batch_size: usize) -> TransferConfig {
        TransferConfig {
            batch_size,
            throttle: Duration::ZERO,
        }
    }

    fn engine<R: CollectionRepository + 'static>(
        repository: Arc<R>,
        config: TransferConfig,
    ) -> (TransferEngine<R>, OperationRegistry) {
        let registry = OperationRegistry::new();
        (
            TransferEngine::new(repository, registry.clone(), config),
            registry,
        )
    }

    async fn seed(
        repo: &InMemoryCollectionRepository,
        company_count: usize,
    ) -> (Collection, Collection, Vec<Uuid>) {
        let source = repo.insert_collection("source").await;
        let target = repo.insert_collection("target").await;
        let mut ids = Vec::new();
        for i in 0..company_count {
            ids.push(repo.insert_company(&format!("company-{}", i)).await.id);
        }
        repo.add_members(source.id, &ids).await.unwrap();
        (source, target, ids)
    }

    async fn wait_for_terminal(registry: &OperationRegistry, id: Uuid) -> Operation {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(operation) = registry.get(id).await {
                if operation.status.is_terminal() {
                    return operation;
                }
            }
            assert!(Instant::now() < deadline, "operation never reached a terminal state");
            sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_copy_dedups_and_completes() {
        // 450 in source, 50 of them already in target, batch size 200:
        // expect three bulk writes (150/200/50 surviving rows) and a final
        // target membership of exactly 450.
        let memory = InMemoryCollectionRepository::new();
        let (source, target, ids) = seed(&memory, 450).await;
        memory.add_members(target.id, &ids[..50]).await.unwrap();

        let repo = Arc::new(InstrumentedRepository::new(memory.clone()));
        let (engine, registry) = engine(repo.clone(), quick_config(200));

        let operation_id = engine
            .start(source.id, target.id, TransferScope::AllMembers, TransferMode::Copy)
            .await
            .unwrap();

        let operation = wait_for_terminal(&registry, operation_id).await;

        assert_eq!(operation.status, OperationStatus::Completed);
        assert_eq!(operation.total, 450);
        assert_eq!(operation.processed, 450);
        assert_eq!(operation.progress_percent(), 100.0);
        assert_eq!(memory.count_members(target.id).await.unwrap(), 450);
        assert_eq!(repo.bulk_writes(), 3);
        // copy leaves the source untouched
        assert_eq!(memory.count_members(source.id).await.unwrap(), 450);
    }

    #[tokio::test]
    async fn test_rerunning_copy_is_idempotent() {
        let memory = InMemoryCollectionRepository::new();
        let (source, target, _) = seed(&memory, 30).await;

        let repo = Arc::new(memory.clone());
        let (engine, registry) = engine(repo, quick_config(10));

        for _ in 0..2 {
            let operation_id = engine
                .start(source.id, target.id, TransferScope::AllMembers, TransferMode::Copy)
                .await
                .unwrap();
            let operation = wait_for_terminal(&registry, operation_id).await;
            assert_eq!(operation.status, OperationStatus::Completed);
        }

        assert_eq!(memory.count_members(target.id).await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_explicit_scope_of_duplicates_writes_nothing() {
        let memory = InMemoryCollectionRepository::new();
        let (source, target, ids) = seed(&memory, 3).await;
        memory.add_members(target.id, &ids).await.unwrap();

        let repo = Arc::new(InstrumentedRepository::new(memory.clone()));
        let (engine, registry) = engine(repo.clone(), quick_config(200));

        let operation_id = engine
            .start(
                source.id,
                target.id,
                TransferScope::Companies(ids.clone()),
                TransferMode::Copy,
            )
            .await
            .unwrap();

        let operation = wait_for_terminal(&registry, operation_id).await;

        assert_eq!(operation.status, OperationStatus::Completed);
        assert_eq!(operation.total, 3);
        assert_eq!(operation.processed, 3);
        assert_eq!(repo.bulk_writes(), 0);
        assert_eq!(memory.count_members(target.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_transfer_to_same_collection_is_rejected() {
        let memory = InMemoryCollectionRepository::new();
        let (source, _, _) = seed(&memory, 2).await;

        let (engine, registry) = engine(Arc::new(memory), quick_config(10));

        let result = engine
            .start(source.id, source.id, TransferScope::AllMembers, TransferMode::Copy)
            .await;

        assert!(matches!(result, Err(CollectionError::InvalidTransfer(_))));
        // no operation record was ever created
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_empty_explicit_scope_is_rejected() {
        let memory = InMemoryCollectionRepository::new();
        let (source, target, _) = seed(&memory, 2).await;

        let (engine, registry) = engine(Arc::new(memory), quick_config(10));

        let result = engine
            .start(
                source.id,
                target.id,
                TransferScope::Companies(vec![]),
                TransferMode::Move,
            )
            .await;

        assert!(matches!(result, Err(CollectionError::InvalidTransfer(_))));
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_rejected() {
        let memory = InMemoryCollectionRepository::new();
        let (source, _, _) = seed(&memory, 2).await;

        let (engine, _) = engine(Arc::new(memory), quick_config(10));

        let result = engine
            .start(
                source.id,
                Uuid::now_v7(),
                TransferScope::AllMembers,
                TransferMode::Copy,
            )
            .await;

        assert!(matches!(result, Err(CollectionError::CollectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_total_is_snapshotted_at_start() {
        let memory = InMemoryCollectionRepository::new();
        let (source, target, _) = seed(&memory, 5).await;

        let config = TransferConfig {
            batch_size: 2,
            throttle: Duration::from_millis(20),
        };
        let (engine, registry) = engine(Arc::new(memory.clone()), config);

        let operation_id = engine
            .start(source.id, target.id, TransferScope::AllMembers, TransferMode::Copy)
            .await
            .unwrap();

        // Grow the source while the operation is running; the new member
        // sorts after the snapshot window and must not change the total.
        let late = memory.insert_company("late-arrival").await;
        memory.add_members(source.id, &[late.id]).await.unwrap();

        let operation = wait_for_terminal(&registry, operation_id).await;

        assert_eq!(operation.status, OperationStatus::Completed);
        assert_eq!(operation.total, 5);
        assert_eq!(operation.processed, 5);
        assert_eq!(memory.count_members(target.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_move_removes_memberships_from_source() {
        let memory = InMemoryCollectionRepository::new();
        let (source, target, ids) = seed(&memory, 5).await;

        let (engine, registry) = engine(Arc::new(memory.clone()), quick_config(2));

        let moved: Vec<Uuid> = ids[..3].to_vec();
        let operation_id = engine
            .start(
                source.id,
                target.id,
                TransferScope::Companies(moved.clone()),
                TransferMode::Move,
            )
            .await
            .unwrap();

        let operation = wait_for_terminal(&registry, operation_id).await;

        assert_eq!(operation.status, OperationStatus::Completed);
        assert_eq!(memory.count_members(target.id).await.unwrap(), 3);
        assert_eq!(memory.count_members(source.id).await.unwrap(), 2);

        let left_behind = memory
            .list_members(source.id, 0, 10)
            .await
            .unwrap();
        assert_eq!(left_behind, ids[3..].to_vec());
    }

    #[tokio::test]
    async fn test_move_skips_companies_not_in_source() {
        let memory = InMemoryCollectionRepository::new();
        let (source, target, ids) = seed(&memory, 2).await;
        let outsider = memory.insert_company("outsider").await;

        let (engine, registry) = engine(Arc::new(memory.clone()), quick_config(10));

        let requested = vec![ids[0], outsider.id, ids[1]];
        let operation_id = engine
            .start(
                source.id,
                target.id,
                TransferScope::Companies(requested),
                TransferMode::Move,
            )
            .await
            .unwrap();

        let operation = wait_for_terminal(&registry, operation_id).await;

        // every requested id counts toward progress, but only actual source
        // members land in the target
        assert_eq!(operation.status, OperationStatus::Completed);
        assert_eq!(operation.total, 3);
        assert_eq!(operation.processed, 3);
        assert_eq!(memory.count_members(target.id).await.unwrap(), 2);
        assert_eq!(memory.count_members(source.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_write_aborts_with_error_status() {
        let memory = InMemoryCollectionRepository::new();
        let (source, target, _) = seed(&memory, 6).await;

        // first bulk write succeeds, second one blows up
        let repo = Arc::new(InstrumentedRepository::failing_after(memory.clone(), 1));
        let (engine, registry) = engine(repo, quick_config(2));

        let operation_id = engine
            .start(source.id, target.id, TransferScope::AllMembers, TransferMode::Copy)
            .await
            .unwrap();

        let operation = wait_for_terminal(&registry, operation_id).await;

        assert_eq!(operation.status, OperationStatus::Error);
        // the failed batch never advanced the count
        assert_eq!(operation.processed, 2);
        assert_eq!(memory.count_members(target.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_processed_is_monotonic_under_polling() {
        let memory = InMemoryCollectionRepository::new();
        let (source, target, _) = seed(&memory, 10).await;

        let config = TransferConfig {
            batch_size: 1,
            throttle: Duration::from_millis(5),
        };
        let (engine, registry) = engine(Arc::new(memory), config);

        let operation_id = engine
            .start(source.id, target.id, TransferScope::AllMembers, TransferMode::Copy)
            .await
            .unwrap();

        let mut observed = Vec::new();
        loop {
            let operation = registry.get(operation_id).await.unwrap();
            observed.push(operation.processed);
            if operation.status.is_terminal() {
                break;
            }
            sleep(Duration::from_millis(2)).await;
        }

        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*observed.last().unwrap(), 10);
    }

    #[tokio::test]
    async fn test_empty_source_completes_immediately() {
        let memory = InMemoryCollectionRepository::new();
        let source = memory.insert_collection("empty-source").await;
        let target = memory.insert_collection("target").await;

        let (engine, registry) = engine(Arc::new(memory), quick_config(10));

        let operation_id = engine
            .start(source.id, target.id, TransferScope::AllMembers, TransferMode::Copy)
            .await
            .unwrap();

        let operation = wait_for_terminal(&registry, operation_id).await;
        assert_eq!(operation.status, OperationStatus::Completed);
        assert_eq!(operation.total, 0);
        assert_eq!(operation.progress_percent(), 100.0);
    }
}
