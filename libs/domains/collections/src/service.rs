use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::dedup;
use crate::error::{CollectionError, CollectionResult};
use crate::models::{
    Collection, CollectionPage, Company, CompanyPage, CompanyWithLiked, OperationProgress,
    OperationStarted, TransferMode, TransferScope, LIKED_COLLECTION_NAME,
};
use crate::registry::OperationRegistry;
use crate::repository::CollectionRepository;
use crate::transfer::{TransferConfig, TransferEngine};

/// Service layer for the company catalog and its collections.
///
/// Owns the one [`OperationRegistry`] instance shared between the transfer
/// engine (which writes progress) and the progress endpoint (which reads
/// it).
#[derive(Clone)]
pub struct CollectionService<R: CollectionRepository> {
    repository: Arc<R>,
    registry: OperationRegistry,
    engine: TransferEngine<R>,
}

impl<R: CollectionRepository + 'static> CollectionService<R> {
    pub fn new(repository: R) -> Self {
        Self::with_config(repository, TransferConfig::default())
    }

    pub fn with_config(repository: R, config: TransferConfig) -> Self {
        let repository = Arc::new(repository);
        let registry = OperationRegistry::new();
        let engine = TransferEngine::new(Arc::clone(&repository), registry.clone(), config);
        Self {
            repository,
            registry,
            engine,
        }
    }

    /// List metadata for every collection
    pub async fn list_collections(&self) -> CollectionResult<Vec<Collection>> {
        self.repository.list_collections().await
    }

    /// One page of a collection's companies plus its metadata
    pub async fn get_collection_page(
        &self,
        id: Uuid,
        offset: u64,
        limit: u64,
    ) -> CollectionResult<CollectionPage> {
        let collection = self
            .repository
            .get_collection(id)
            .await?
            .ok_or(CollectionError::CollectionNotFound(id))?;

        let (companies, total) = self.repository.list_companies_in(id, offset, limit).await?;
        let companies = self.with_liked_flags(companies).await?;

        Ok(CollectionPage {
            id: collection.id,
            name: collection.name,
            companies,
            total,
        })
    }

    /// One page of the full company catalog
    pub async fn list_companies(&self, offset: u64, limit: u64) -> CollectionResult<CompanyPage> {
        let (companies, total) = self.repository.list_companies(offset, limit).await?;
        let companies = self.with_liked_flags(companies).await?;

        Ok(CompanyPage { companies, total })
    }

    /// Synchronously add an explicit set of companies to a collection,
    /// skipping ones already present. Returns the collection's first page.
    pub async fn add_companies(
        &self,
        collection_id: Uuid,
        company_ids: Vec<Uuid>,
    ) -> CollectionResult<CollectionPage> {
        self.repository
            .get_collection(collection_id)
            .await?
            .ok_or(CollectionError::CollectionNotFound(collection_id))?;

        let existing = self
            .repository
            .list_members_among(collection_id, &company_ids)
            .await?;
        let fresh = dedup::missing_members(&company_ids, &existing);

        if !fresh.is_empty() {
            self.repository.add_members(collection_id, &fresh).await?;
            tracing::info!(
                %collection_id,
                added = fresh.len(),
                skipped = company_ids.len() - fresh.len(),
                "Added companies to collection"
            );
        }

        self.get_collection_page(collection_id, 0, 10).await
    }

    /// Start an asynchronous copy of every company in `source_id` into
    /// `target_id`. Returns immediately with the operation id to poll.
    pub async fn copy_collection(
        &self,
        source_id: Uuid,
        target_id: Uuid,
    ) -> CollectionResult<OperationStarted> {
        let operation_id = self
            .engine
            .start(
                source_id,
                target_id,
                TransferScope::AllMembers,
                TransferMode::Copy,
            )
            .await?;
        Ok(OperationStarted { operation_id })
    }

    /// Start an asynchronous move of an explicit set of companies from
    /// `source_id` into `target_id`.
    pub async fn move_companies(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        company_ids: Vec<Uuid>,
    ) -> CollectionResult<OperationStarted> {
        let operation_id = self
            .engine
            .start(
                source_id,
                target_id,
                TransferScope::Companies(company_ids),
                TransferMode::Move,
            )
            .await?;
        Ok(OperationStarted { operation_id })
    }

    /// Consistent progress snapshot for one operation
    pub async fn operation_progress(&self, id: Uuid) -> CollectionResult<OperationProgress> {
        self.registry
            .get(id)
            .await
            .map(|operation| operation.progress_view())
            .ok_or(CollectionError::OperationNotFound(id))
    }

    /// Decorate companies with their membership in the well-known "Liked"
    /// collection. One batch lookup, not one query per company.
    async fn with_liked_flags(
        &self,
        companies: Vec<Company>,
    ) -> CollectionResult<Vec<CompanyWithLiked>> {
        let liked_ids = match self
            .repository
            .find_collection_by_name(LIKED_COLLECTION_NAME)
            .await?
        {
            Some(liked) => {
                let ids: Vec<Uuid> = companies.iter().map(|c| c.id).collect();
                self.repository.list_members_among(liked.id, &ids).await?
            }
            None => HashSet::new(),
        };

        Ok(companies
            .into_iter()
            .map(|company| CompanyWithLiked {
                liked: liked_ids.contains(&company.id),
                id: company.id,
                name: company.name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockCollectionRepository;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn company(name: &str) -> Company {
        Company {
            id: Uuid::now_v7(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    fn collection(name: &str) -> Collection {
        Collection {
            id: Uuid::now_v7(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_operation_progress_unknown_id() {
        let service = CollectionService::new(MockCollectionRepository::new());

        let result = service.operation_progress(Uuid::new_v4()).await;

        assert!(matches!(
            result,
            Err(CollectionError::OperationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_companies_marks_liked_members() {
        let mut mock_repo = MockCollectionRepository::new();
        let liked = collection("Liked");
        let liked_id = liked.id;

        let first = company("liked-company");
        let second = company("other-company");
        let first_id = first.id;
        let listing = vec![first, second];

        mock_repo
            .expect_list_companies()
            .with(eq(0u64), eq(10u64))
            .returning(move |_, _| Ok((listing.clone(), 2)));
        mock_repo
            .expect_find_collection_by_name()
            .with(eq(LIKED_COLLECTION_NAME))
            .returning(move |_| Ok(Some(liked.clone())));
        mock_repo
            .expect_list_members_among()
            .withf(move |id, _| *id == liked_id)
            .returning(move |_, _| Ok([first_id].into_iter().collect()));

        let service = CollectionService::new(mock_repo);
        let page = service.list_companies(0, 10).await.unwrap();

        assert_eq!(page.total, 2);
        assert!(page.companies[0].liked);
        assert!(!page.companies[1].liked);
    }

    #[tokio::test]
    async fn test_list_companies_without_liked_collection() {
        let mut mock_repo = MockCollectionRepository::new();

        let listing = vec![company("a"), company("b")];
        mock_repo
            .expect_list_companies()
            .returning(move |_, _| Ok((listing.clone(), 2)));
        mock_repo
            .expect_find_collection_by_name()
            .returning(|_| Ok(None));

        let service = CollectionService::new(mock_repo);
        let page = service.list_companies(0, 10).await.unwrap();

        assert!(page.companies.iter().all(|c| !c.liked));
    }

    #[tokio::test]
    async fn test_get_collection_page_unknown_collection() {
        let mut mock_repo = MockCollectionRepository::new();
        mock_repo.expect_get_collection().returning(|_| Ok(None));

        let service = CollectionService::new(mock_repo);
        let result = service.get_collection_page(Uuid::new_v4(), 0, 10).await;

        assert!(matches!(
            result,
            Err(CollectionError::CollectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_companies_only_writes_missing_rows() {
        let mut mock_repo = MockCollectionRepository::new();
        let target = collection("My List");
        let target_id = target.id;

        let kept = Uuid::now_v7();
        let duplicate = Uuid::now_v7();

        mock_repo
            .expect_get_collection()
            .with(eq(target_id))
            .returning(move |_| Ok(Some(target.clone())));
        mock_repo
            .expect_list_members_among()
            .withf(move |id, _| *id == target_id)
            .returning(move |_, _| Ok([duplicate].into_iter().collect()));
        mock_repo
            .expect_add_members()
            .withf(move |id, ids| *id == target_id && ids == [kept])
            .times(1)
            .returning(|_, _| Ok(()));
        mock_repo
            .expect_list_companies_in()
            .returning(|_, _, _| Ok((vec![], 2)));
        mock_repo
            .expect_find_collection_by_name()
            .returning(|_| Ok(None));

        let service = CollectionService::new(mock_repo);
        let page = service
            .add_companies(target_id, vec![kept, duplicate])
            .await
            .unwrap();

        assert_eq!(page.total, 2);
    }
}
